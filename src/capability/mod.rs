pub mod authority;
pub mod presenter;
pub mod types;

pub use authority::CapabilityAuthority;
pub use presenter::{CompletionSignal, ConsentCompletion, ConsentPresenter, PresentError};
pub use types::{Capability, CheckReport, Outcome, Pattern, PatternError};
