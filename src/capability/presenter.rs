use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use super::types::Capability;

#[derive(Debug, Error)]
pub enum PresentError {
    #[error("no active UI context to present consent")]
    NoActiveContext,
    #[error("consent presenter unavailable: {0}")]
    Unavailable(String),
}

/// How a [`ConsentCompletion`] reached the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    /// The presenter reported the flow finished.
    Finished,
    /// Every copy of the completion was dropped without a signal.
    Abandoned,
}

/// Continuation handed to a [`ConsentPresenter`].
///
/// Cheap to clone; all clones share one signal. The first call to
/// [`ConsentCompletion::complete`] wins, later calls are ignored. Dropping
/// the last clone without completing counts as an abandoned flow, so a torn
/// down UI never leaks the session.
#[derive(Clone)]
pub struct ConsentCompletion {
    inner: Arc<CompletionInner>,
}

struct CompletionInner {
    signalled: AtomicBool,
    notify: Box<dyn Fn(CompletionSignal) + Send + Sync>,
}

impl ConsentCompletion {
    pub fn new(notify: impl Fn(CompletionSignal) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(CompletionInner {
                signalled: AtomicBool::new(false),
                notify: Box::new(notify),
            }),
        }
    }

    /// Reports that the consent flow is over. Returns `false` if a signal
    /// was already delivered.
    pub fn complete(&self) -> bool {
        if self.inner.signalled.swap(true, Ordering::AcqRel) {
            tracing::warn!("Consent completion signalled more than once; ignoring");
            return false;
        }
        (self.inner.notify)(CompletionSignal::Finished);
        true
    }

    #[must_use]
    pub fn is_signalled(&self) -> bool {
        self.inner.signalled.load(Ordering::Acquire)
    }
}

impl Drop for CompletionInner {
    fn drop(&mut self) {
        if !self.signalled.swap(true, Ordering::AcqRel) {
            tracing::warn!("Consent completion dropped without a signal");
            (self.notify)(CompletionSignal::Abandoned);
        }
    }
}

impl fmt::Debug for ConsentCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentCompletion")
            .field("signalled", &self.is_signalled())
            .finish_non_exhaustive()
    }
}

/// Drives the user-facing consent flow for capabilities not yet granted.
///
/// `present` must return promptly. The outcome is not reported through the
/// completion; the orchestrator re-reads the authority once it fires.
pub trait ConsentPresenter: Send + Sync {
    fn present(
        &self,
        capabilities: &[Capability],
        completion: ConsentCompletion,
    ) -> Result<(), PresentError>;
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use parking_lot::Mutex;

    /// Keeps every completion it receives so tests decide when to fire.
    #[derive(Default)]
    pub struct RecordingPresenter {
        calls: Mutex<Vec<Vec<Capability>>>,
        completions: Mutex<Vec<ConsentCompletion>>,
    }

    impl RecordingPresenter {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<Vec<Capability>> {
            self.calls.lock().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        /// Returns a clone of the most recent completion.
        pub fn last_completion(&self) -> Option<ConsentCompletion> {
            self.completions.lock().last().cloned()
        }

        /// Drops every stored completion.
        pub fn forget_all(&self) {
            self.completions.lock().clear();
        }
    }

    impl ConsentPresenter for RecordingPresenter {
        fn present(
            &self,
            capabilities: &[Capability],
            completion: ConsentCompletion,
        ) -> Result<(), PresentError> {
            self.calls.lock().push(capabilities.to_vec());
            self.completions.lock().push(completion);
            Ok(())
        }
    }

    /// Never manages to start a flow.
    #[derive(Debug, Default)]
    pub struct FailingPresenter;

    impl ConsentPresenter for FailingPresenter {
        fn present(
            &self,
            _capabilities: &[Capability],
            _completion: ConsentCompletion,
        ) -> Result<(), PresentError> {
            Err(PresentError::NoActiveContext)
        }
    }

    /// Signals inside `present`, before returning.
    pub struct InlinePresenter {
        before_signal: Box<dyn Fn(&[Capability]) + Send + Sync>,
    }

    impl InlinePresenter {
        pub fn new(before_signal: impl Fn(&[Capability]) + Send + Sync + 'static) -> Self {
            Self {
                before_signal: Box::new(before_signal),
            }
        }
    }

    impl ConsentPresenter for InlinePresenter {
        fn present(
            &self,
            capabilities: &[Capability],
            completion: ConsentCompletion,
        ) -> Result<(), PresentError> {
            (self.before_signal)(capabilities);
            completion.complete();
            Ok(())
        }
    }
}
