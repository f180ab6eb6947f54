//! Exactly-once delivery of session outcomes.
//!
//! Outcomes are never delivered on the thread that completed the session.
//! They are either spawned onto a tokio runtime or queued for a
//! [`DeliveryLoop`] that the host drives on its own context (for example a
//! UI event loop).

use parking_lot::Mutex;
use std::fmt;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::mpsc;

use super::session::SessionId;
use crate::capability::types::Outcome;
use crate::core::error::{Result, WardenError};

pub type ResultCallback = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// Holds a session's callback until it is spent.
pub struct DeliveryTicket {
    session: SessionId,
    callback: Mutex<Option<ResultCallback>>,
}

impl DeliveryTicket {
    #[must_use]
    pub fn new(session: SessionId, callback: ResultCallback) -> Self {
        Self {
            session,
            callback: Mutex::new(Some(callback)),
        }
    }

    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.callback.lock().is_none()
    }

    fn take(&self) -> Option<ResultCallback> {
        self.callback.lock().take()
    }
}

impl fmt::Debug for DeliveryTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryTicket")
            .field("session", &self.session)
            .field("spent", &self.is_spent())
            .finish()
    }
}

struct Delivery {
    session: SessionId,
    callback: ResultCallback,
    outcome: Outcome,
}

#[derive(Clone)]
enum DeliveryContext {
    Runtime(RuntimeHandle),
    Queue(mpsc::UnboundedSender<Delivery>),
}

#[derive(Clone)]
pub struct ResultDispatcher {
    context: DeliveryContext,
}

impl ResultDispatcher {
    /// Delivers by spawning onto the given runtime.
    #[must_use]
    pub const fn on_runtime(handle: RuntimeHandle) -> Self {
        Self {
            context: DeliveryContext::Runtime(handle),
        }
    }

    /// Delivers on the runtime the caller is currently inside.
    pub fn current() -> Result<Self> {
        RuntimeHandle::try_current()
            .map(Self::on_runtime)
            .map_err(|e| WardenError::NoRuntime(format!("result delivery: {e}")))
    }

    /// Delivers through a queue drained by the returned loop.
    #[must_use]
    pub fn queued() -> (Self, DeliveryLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                context: DeliveryContext::Queue(tx),
            },
            DeliveryLoop { rx },
        )
    }

    /// Hands `outcome` to the ticket's callback on the configured context.
    ///
    /// A spent ticket is refused with [`WardenError::DuplicateDelivery`].
    pub fn deliver(&self, ticket: &DeliveryTicket, outcome: Outcome) -> Result<()> {
        let Some(callback) = ticket.take() else {
            tracing::error!(
                session = %ticket.session(),
                "Contract violation: result delivered twice"
            );
            return Err(WardenError::DuplicateDelivery(ticket.session()));
        };

        let session = ticket.session();
        match &self.context {
            DeliveryContext::Runtime(handle) => {
                handle.spawn(async move {
                    tracing::debug!(session = %session, "Delivering outcome");
                    callback(outcome);
                });
                Ok(())
            }
            DeliveryContext::Queue(tx) => tx
                .send(Delivery {
                    session,
                    callback,
                    outcome,
                })
                .map_err(|_| {
                    tracing::error!(session = %session, "Delivery queue closed; outcome dropped");
                    WardenError::DeliveryContextClosed
                }),
        }
    }
}

impl fmt::Debug for ResultDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.context {
            DeliveryContext::Runtime(_) => "runtime",
            DeliveryContext::Queue(_) => "queued",
        };
        f.debug_struct("ResultDispatcher")
            .field("mode", &mode)
            .finish()
    }
}

/// Receiving end of a queued dispatcher.
pub struct DeliveryLoop {
    rx: mpsc::UnboundedReceiver<Delivery>,
}

impl DeliveryLoop {
    /// Runs callbacks until every dispatcher clone is dropped.
    pub async fn run(mut self) {
        while let Some(delivery) = self.rx.recv().await {
            Self::invoke(delivery);
        }
        tracing::debug!("Delivery loop finished");
    }

    /// Runs whatever is queued right now without waiting. Returns how many
    /// callbacks ran.
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(delivery) = self.rx.try_recv() {
            Self::invoke(delivery);
            count += 1;
        }
        count
    }

    fn invoke(delivery: Delivery) {
        tracing::debug!(session = %delivery.session, "Delivering outcome");
        (delivery.callback)(delivery.outcome);
    }
}
