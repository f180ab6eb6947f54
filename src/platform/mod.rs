//! Concrete collaborators for hosts without a real platform binding.

pub mod channel;
pub mod scripted;
pub mod static_authority;

pub use channel::{ChannelPresenter, ConsentPrompt};
pub use scripted::ScriptedPresenter;
pub use static_authority::StaticAuthority;
