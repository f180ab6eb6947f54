//! Capability request orchestration.
//!
//! A request runs a synchronous check phase against the
//! [`CapabilityAuthority`], then either completes on the spot (nothing to
//! ask) or hands the pending set to the [`ConsentPresenter`]. When the
//! presenter signals, grant status is re-read from the authority and the
//! outcome goes to the [`ResultDispatcher`]. Every request gets its own
//! session; nothing is shared between sessions except the collaborators.

pub mod dispatcher;
pub mod events;
pub mod session;

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::capability::authority::CapabilityAuthority;
use crate::capability::presenter::{CompletionSignal, ConsentCompletion, ConsentPresenter};
use crate::capability::types::{Capability, CheckReport, Outcome, dedup_preserving_order};
use crate::core::error::{Result, WardenError};

pub use dispatcher::{DeliveryLoop, DeliveryTicket, ResultCallback, ResultDispatcher};
pub use events::{SessionEvent, SessionEventEmitter, SessionEventHandler};
pub use session::{RequestSession, SessionId, SessionState};

use session::{AfterPresent, Resolution};

struct SessionCell {
    id: SessionId,
    requested: Vec<Capability>,
    session: Mutex<RequestSession>,
    ticket: DeliveryTicket,
}

/// Caller's reference to a running or finished session.
#[derive(Clone)]
pub struct Handle {
    owner: Uuid,
    cell: Arc<SessionCell>,
}

impl Handle {
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.cell.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.cell.session.lock().state()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.cell.session.lock().is_completed()
    }

    /// The deduplicated capabilities this session covers.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.cell.requested
    }

    /// Final outcome, once the session has completed.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        let session = self.cell.session.lock();
        session.is_completed().then(|| session.outcome())
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.cell.id)
            .field("state", &self.state())
            .finish()
    }
}

struct Core {
    id: Uuid,
    authority: Arc<dyn CapabilityAuthority>,
    presenter: Arc<dyn ConsentPresenter>,
    dispatcher: ResultDispatcher,
    events: SessionEventEmitter,
}

impl Core {
    fn partition(&self, requested: &[Capability]) -> CheckReport {
        let mut report = CheckReport::default();
        for capability in requested {
            if !self.authority.exists(capability) {
                tracing::warn!(capability = %capability, "Capability not recognized by authority");
                report.unknown.push(capability.clone());
            } else if self.authority.is_granted(capability) {
                report.granted.push(capability.clone());
            } else {
                report.pending.push(capability.clone());
            }
        }
        tracing::debug!(
            granted = report.granted.len(),
            pending = report.pending.len(),
            unknown = report.unknown.len(),
            "Check phase complete"
        );
        report
    }

    fn dispatch(self: &Arc<Self>, cell: &Arc<SessionCell>) -> Result<()> {
        let pending = cell.session.lock().begin_dispatch().inspect_err(|e| {
            if e.is_programmer_error() {
                tracing::error!(session = %cell.id, "Rejected dispatch: {e}");
            }
        })?;

        tracing::debug!(session = %cell.id, pending = pending.len(), "Dispatching consent flow");
        self.events.emit_dispatched(cell.id, &pending);

        let completion = self.completion_for(cell);
        match self.presenter.present(&pending, completion) {
            Ok(()) => {
                let next = cell.session.lock().end_present();
                if next == AfterPresent::Finalize {
                    self.finalize(cell);
                }
            }
            Err(e) => {
                tracing::warn!(
                    session = %cell.id,
                    "Consent presenter failed to start, denying pending capabilities: {e}"
                );
                cell.session.lock().abort_present();
                self.finish(cell, Resolution::deny_all(&pending), false);
            }
        }
        Ok(())
    }

    /// The completion holds the core until its last clone is dropped, so an
    /// in-flight session still delivers after every `Orchestrator` is gone.
    fn completion_for(self: &Arc<Self>, cell: &Arc<SessionCell>) -> ConsentCompletion {
        let core = Arc::clone(self);
        let cell = Arc::clone(cell);
        ConsentCompletion::new(move |signal| core.on_signal(&cell, signal))
    }

    fn on_signal(&self, cell: &SessionCell, signal: CompletionSignal) {
        let proceed = cell.session.lock().accept_signal(signal);
        if !proceed {
            tracing::debug!(session = %cell.id, ?signal, "Presenter signal deferred or ignored");
            return;
        }
        self.finalize(cell);
    }

    /// Re-reads the authority for every pending capability and completes.
    fn finalize(&self, cell: &SessionCell) {
        let pending = {
            let session = cell.session.lock();
            if session.is_completed() {
                return;
            }
            session.pending().to_vec()
        };

        let mut resolution = Resolution::default();
        for capability in pending {
            if self.authority.is_granted(&capability) {
                resolution.granted.push(capability);
            } else if self.authority.will_show_rationale(&capability) {
                resolution.denied.push(capability);
            } else {
                resolution.denied_permanently.push(capability);
            }
        }
        self.finish(cell, resolution, false);
    }

    fn finish(&self, cell: &SessionCell, resolution: Resolution, cancelled: bool) {
        let outcome = cell.session.lock().complete(resolution);
        match outcome {
            Some(outcome) => self.deliver(cell, outcome, cancelled),
            None => tracing::debug!(session = %cell.id, "Session already completed"),
        }
    }

    fn deliver(&self, cell: &SessionCell, outcome: Outcome, cancelled: bool) {
        tracing::info!(
            session = %cell.id,
            granted = outcome.granted.len(),
            denied = outcome.denied.len(),
            denied_permanently = outcome.denied_permanently.len(),
            unknown = outcome.unknown.len(),
            cancelled,
            "Session completed"
        );
        self.events
            .emit_completed(cell.id, outcome.clone(), cancelled);
        if let Err(e) = self.dispatcher.deliver(&cell.ticket, outcome) {
            tracing::error!(session = %cell.id, "Outcome not delivered: {e}");
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    core: Arc<Core>,
}

impl Orchestrator {
    /// Orchestrator delivering on the current tokio runtime.
    pub fn new(
        authority: Arc<dyn CapabilityAuthority>,
        presenter: Arc<dyn ConsentPresenter>,
    ) -> Result<Self> {
        Self::builder(authority, presenter).build()
    }

    #[must_use]
    pub fn builder(
        authority: Arc<dyn CapabilityAuthority>,
        presenter: Arc<dyn ConsentPresenter>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            authority,
            presenter,
            dispatcher: None,
            events: SessionEventEmitter::new(),
        }
    }

    /// Partitions `capabilities` without creating a session or asking anyone.
    pub fn check(&self, capabilities: &[Capability]) -> Result<CheckReport> {
        if capabilities.is_empty() {
            return Err(WardenError::EmptyRequest);
        }
        let requested = dedup_preserving_order(capabilities.to_vec());
        Ok(self.core.partition(&requested))
    }

    /// Starts a session for `capabilities`. `callback` runs exactly once, on
    /// the dispatcher's context, with the final outcome.
    pub fn request<F>(&self, capabilities: Vec<Capability>, callback: F) -> Result<Handle>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        if capabilities.is_empty() {
            tracing::error!("Rejected empty capability request");
            return Err(WardenError::EmptyRequest);
        }

        let mut session = RequestSession::new(capabilities);
        let report = self.core.partition(session.requested());
        session.apply_check(report);

        let id = session.id();
        let needs_consent = !session.pending().is_empty();
        self.core.events.emit_checked(id, session.pending());

        let cell = Arc::new(SessionCell {
            id,
            requested: session.requested().to_vec(),
            session: Mutex::new(session),
            ticket: DeliveryTicket::new(id, Box::new(callback)),
        });
        let handle = Handle {
            owner: self.core.id,
            cell: Arc::clone(&cell),
        };

        if needs_consent {
            self.core.dispatch(&cell)?;
        } else {
            self.core.finish(&cell, Resolution::default(), false);
        }
        Ok(handle)
    }

    /// Awaitable form of [`Orchestrator::request`].
    pub async fn request_async(&self, capabilities: Vec<Capability>) -> Result<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.request(capabilities, move |outcome| {
            let _ = tx.send(outcome);
        })?;
        rx.await.map_err(|_| WardenError::DeliveryContextClosed)
    }

    /// Re-dispatches an existing session. Sessions are single-flight, so this
    /// only ever reports why it cannot proceed.
    pub fn dispatch(&self, handle: &Handle) -> Result<()> {
        self.owns(handle)?;
        self.core.dispatch(&handle.cell)
    }

    /// Forces completion, denying every pending capability. Later presenter
    /// signals for the session are ignored.
    pub fn cancel(&self, handle: &Handle) -> Result<()> {
        self.owns(handle)?;
        let outcome = handle.cell.session.lock().cancel()?;
        tracing::debug!(session = %handle.cell.id, "Session cancelled");
        self.core.deliver(&handle.cell, outcome, true);
        Ok(())
    }

    fn owns(&self, handle: &Handle) -> Result<()> {
        if handle.owner == self.core.id {
            Ok(())
        } else {
            Err(WardenError::UnknownHandle(handle.cell.id))
        }
    }
}

pub struct OrchestratorBuilder {
    authority: Arc<dyn CapabilityAuthority>,
    presenter: Arc<dyn ConsentPresenter>,
    dispatcher: Option<ResultDispatcher>,
    events: SessionEventEmitter,
}

impl OrchestratorBuilder {
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: ResultDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn event_handler(mut self, handler: Arc<dyn SessionEventHandler>) -> Self {
        self.events.add_handler(handler);
        self
    }

    /// Falls back to delivering on the current runtime when no dispatcher
    /// was given.
    pub fn build(self) -> Result<Orchestrator> {
        let dispatcher = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => ResultDispatcher::current()?,
        };
        Ok(Orchestrator {
            core: Arc::new(Core {
                id: Uuid::new_v4(),
                authority: self.authority,
                presenter: self.presenter,
                dispatcher,
                events: self.events,
            }),
        })
    }
}
