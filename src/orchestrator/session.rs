use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::capability::presenter::CompletionSignal;
use crate::capability::types::{Capability, CheckReport, Outcome, dedup_preserving_order};
use crate::core::error::{Result, WardenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Created -> Checked -> {Completed | Dispatched -> Completed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Checked,
    Dispatched,
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Checked => write!(f, "checked"),
            Self::Dispatched => write!(f, "dispatched"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Final classification of the pending set.
#[derive(Debug, Default)]
pub(crate) struct Resolution {
    pub granted: Vec<Capability>,
    pub denied: Vec<Capability>,
    pub denied_permanently: Vec<Capability>,
}

impl Resolution {
    pub fn deny_all(pending: &[Capability]) -> Self {
        Self {
            denied: pending.to_vec(),
            ..Self::default()
        }
    }
}

/// What the dispatcher should do once `present` has returned.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AfterPresent {
    /// Still waiting on the presenter.
    Wait,
    /// A signal arrived while presenting; finalize now.
    Finalize,
    /// Already completed, nothing to do.
    Done,
}

/// One orchestration attempt. Single-use.
#[derive(Debug)]
pub struct RequestSession {
    id: SessionId,
    requested: Vec<Capability>,
    granted: Vec<Capability>,
    pending: Vec<Capability>,
    denied: Vec<Capability>,
    denied_permanently: Vec<Capability>,
    unknown: Vec<Capability>,
    state: SessionState,
    dispatched: bool,
    completed: bool,
    cancelled: bool,
    presenting: bool,
    deferred_signal: Option<CompletionSignal>,
}

impl RequestSession {
    /// Creates a session over the deduplicated request.
    #[must_use]
    pub fn new(requested: Vec<Capability>) -> Self {
        Self {
            id: SessionId::new(),
            requested: dedup_preserving_order(requested),
            granted: Vec::new(),
            pending: Vec::new(),
            denied: Vec::new(),
            denied_permanently: Vec::new(),
            unknown: Vec::new(),
            state: SessionState::Created,
            dispatched: false,
            completed: false,
            cancelled: false,
            presenting: false,
            deferred_signal: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn requested(&self) -> &[Capability] {
        &self.requested
    }

    #[must_use]
    pub fn pending(&self) -> &[Capability] {
        &self.pending
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub const fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Records the check-phase partition.
    pub(crate) fn apply_check(&mut self, report: CheckReport) {
        debug_assert_eq!(self.state, SessionState::Created);
        debug_assert_eq!(
            report.granted.len() + report.pending.len() + report.unknown.len(),
            self.requested.len()
        );
        self.granted = report.granted;
        self.pending = report.pending;
        self.unknown = report.unknown;
        self.state = SessionState::Checked;
    }

    /// Marks the session dispatched and returns the set to present.
    pub(crate) fn begin_dispatch(&mut self) -> Result<Vec<Capability>> {
        if self.completed {
            return Err(WardenError::AlreadyCompleted(self.id));
        }
        if self.dispatched {
            return Err(WardenError::AlreadyInFlight(self.id));
        }
        self.dispatched = true;
        self.presenting = true;
        self.state = SessionState::Dispatched;
        Ok(self.pending.clone())
    }

    /// Records a presenter signal. Returns `true` when the caller should
    /// finalize right away; signals that arrive while `present` is still
    /// running are held until it returns.
    pub(crate) fn accept_signal(&mut self, signal: CompletionSignal) -> bool {
        if self.completed {
            return false;
        }
        if self.presenting {
            self.deferred_signal.get_or_insert(signal);
            return false;
        }
        true
    }

    /// Leaves the presenting window after `present` returned `Ok`.
    pub(crate) fn end_present(&mut self) -> AfterPresent {
        self.presenting = false;
        if self.completed {
            AfterPresent::Done
        } else if self.deferred_signal.take().is_some() {
            AfterPresent::Finalize
        } else {
            AfterPresent::Wait
        }
    }

    /// Leaves the presenting window after `present` failed.
    pub(crate) fn abort_present(&mut self) {
        self.presenting = false;
        self.deferred_signal = None;
    }

    /// Applies the final classification of `pending`. Returns `None` when
    /// the session had already completed.
    pub(crate) fn complete(&mut self, resolution: Resolution) -> Option<Outcome> {
        if self.completed {
            return None;
        }
        debug_assert_eq!(
            resolution.granted.len() + resolution.denied.len() + resolution.denied_permanently.len(),
            self.pending.len()
        );
        self.granted.extend(resolution.granted);
        self.denied = resolution.denied;
        self.denied_permanently = resolution.denied_permanently;
        self.completed = true;
        self.state = SessionState::Completed;
        Some(self.outcome())
    }

    /// Completes with every pending capability denied, non-permanently.
    pub(crate) fn cancel(&mut self) -> Result<Outcome> {
        if self.completed {
            return Err(WardenError::AlreadyCompleted(self.id));
        }
        let resolution = Resolution::deny_all(&self.pending);
        self.cancelled = true;
        self.complete(resolution)
            .ok_or(WardenError::AlreadyCompleted(self.id))
    }

    /// Snapshot of the current disposition.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        Outcome {
            granted: self.granted.clone(),
            denied: self.denied.clone(),
            denied_permanently: self.denied_permanently.clone(),
            unknown: self.unknown.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(ids: &[&str]) -> Vec<Capability> {
        Capability::parse_all(ids.iter().copied()).unwrap()
    }

    fn checked_session() -> RequestSession {
        let mut session = RequestSession::new(caps(&["camera", "mic", "ghost", "mic"]));
        session.apply_check(CheckReport {
            granted: caps(&["camera"]),
            pending: caps(&["mic"]),
            unknown: caps(&["ghost"]),
        });
        session
    }

    #[test]
    fn test_new_session_dedups() {
        let session = RequestSession::new(caps(&["mic", "mic", "camera"]));
        assert_eq!(session.requested(), caps(&["mic", "camera"]).as_slice());
        assert_eq!(session.state(), SessionState::Created);
    }

    #[test]
    fn test_dispatch_only_once() {
        let mut session = checked_session();
        assert_eq!(session.begin_dispatch().unwrap(), caps(&["mic"]));
        assert_eq!(session.state(), SessionState::Dispatched);
        assert!(matches!(
            session.begin_dispatch(),
            Err(WardenError::AlreadyInFlight(_))
        ));
    }

    #[test]
    fn test_complete_only_once() {
        let mut session = checked_session();
        session.begin_dispatch().unwrap();
        session.end_present();

        let outcome = session
            .complete(Resolution {
                denied_permanently: caps(&["mic"]),
                ..Resolution::default()
            })
            .unwrap();
        assert_eq!(outcome.granted, caps(&["camera"]));
        assert_eq!(outcome.denied_permanently, caps(&["mic"]));
        assert_eq!(outcome.unknown, caps(&["ghost"]));

        assert!(session.complete(Resolution::deny_all(&caps(&["mic"]))).is_none());
        assert!(matches!(
            session.begin_dispatch(),
            Err(WardenError::AlreadyCompleted(_))
        ));
    }

    #[test]
    fn test_signal_during_present_is_deferred() {
        let mut session = checked_session();
        session.begin_dispatch().unwrap();

        assert!(!session.accept_signal(CompletionSignal::Finished));
        assert_eq!(session.end_present(), AfterPresent::Finalize);
        assert!(session.accept_signal(CompletionSignal::Finished));
    }

    #[test]
    fn test_abort_present_drops_deferred_signal() {
        let mut session = checked_session();
        session.begin_dispatch().unwrap();
        session.accept_signal(CompletionSignal::Abandoned);
        session.abort_present();
        assert_eq!(session.end_present(), AfterPresent::Wait);
    }

    #[test]
    fn test_cancel_denies_pending() {
        let mut session = checked_session();
        session.begin_dispatch().unwrap();
        session.end_present();

        let outcome = session.cancel().unwrap();
        assert_eq!(outcome.denied, caps(&["mic"]));
        assert!(outcome.denied_permanently.is_empty());
        assert!(session.was_cancelled());
        assert!(!session.accept_signal(CompletionSignal::Finished));
        assert!(matches!(
            session.cancel(),
            Err(WardenError::AlreadyCompleted(_))
        ));
    }
}
