pub mod capability;
pub mod cli;
pub mod config;
pub mod core;
pub mod logging;
pub mod orchestrator;
pub mod platform;

pub use capability::{
    Capability, CapabilityAuthority, CheckReport, ConsentCompletion, ConsentPresenter, Outcome,
    PresentError,
};
pub use crate::core::{Result, WardenError};
pub use orchestrator::{Handle, Orchestrator, ResultDispatcher, SessionId, SessionState};
