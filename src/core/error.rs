use thiserror::Error;

use crate::orchestrator::SessionId;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Capability request is empty")]
    EmptyRequest,

    #[error("Invalid capability identifier: {0:?}")]
    InvalidCapability(String),

    #[error("Session {0} is already in flight")]
    AlreadyInFlight(SessionId),

    #[error("Session {0} has already completed")]
    AlreadyCompleted(SessionId),

    #[error("Session {0} is not owned by this orchestrator")]
    UnknownHandle(SessionId),

    #[error("Result for session {0} was already delivered")]
    DuplicateDelivery(SessionId),

    #[error("Result delivery context is closed")]
    DeliveryContextClosed,

    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WardenError {
    /// Errors that indicate an integration bug rather than a runtime condition.
    #[must_use]
    pub const fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyRequest
                | Self::InvalidCapability(_)
                | Self::AlreadyInFlight(_)
                | Self::DuplicateDelivery(_)
                | Self::NoRuntime(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
