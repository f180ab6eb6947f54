use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::session::SessionId;
use crate::capability::types::{Capability, Outcome};

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Checked {
        session: SessionId,
        pending: Vec<Capability>,
        at: DateTime<Utc>,
    },
    Dispatched {
        session: SessionId,
        capabilities: Vec<Capability>,
        at: DateTime<Utc>,
    },
    Completed {
        session: SessionId,
        outcome: Outcome,
        cancelled: bool,
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    #[must_use]
    pub const fn session(&self) -> SessionId {
        match self {
            Self::Checked { session, .. }
            | Self::Dispatched { session, .. }
            | Self::Completed { session, .. } => *session,
        }
    }
}

pub trait SessionEventHandler: Send + Sync {
    fn handle(&self, event: SessionEvent);
}

#[derive(Clone, Default)]
pub struct SessionEventEmitter {
    handlers: Vec<Arc<dyn SessionEventHandler>>,
}

impl SessionEventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn SessionEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn emit(&self, event: SessionEvent) {
        for handler in &self.handlers {
            handler.handle(event.clone());
        }
    }

    pub fn emit_checked(&self, session: SessionId, pending: &[Capability]) {
        self.emit(SessionEvent::Checked {
            session,
            pending: pending.to_vec(),
            at: Utc::now(),
        });
    }

    pub fn emit_dispatched(&self, session: SessionId, capabilities: &[Capability]) {
        self.emit(SessionEvent::Dispatched {
            session,
            capabilities: capabilities.to_vec(),
            at: Utc::now(),
        });
    }

    pub fn emit_completed(&self, session: SessionId, outcome: Outcome, cancelled: bool) {
        self.emit(SessionEvent::Completed {
            session,
            outcome,
            cancelled,
            at: Utc::now(),
        });
    }
}
