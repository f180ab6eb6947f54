use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle as RuntimeHandle;

use super::static_authority::StaticAuthority;
use crate::capability::presenter::{ConsentCompletion, ConsentPresenter, PresentError};
use crate::capability::types::Capability;
use crate::config::{Answer, PresenterConfig};
use crate::core::error::{Result, WardenError};

/// Presenter that answers every prompt the same way after a delay,
/// recording the decision in a [`StaticAuthority`].
pub struct ScriptedPresenter {
    authority: Arc<StaticAuthority>,
    answer: Answer,
    delay: Duration,
    runtime: RuntimeHandle,
}

impl ScriptedPresenter {
    #[must_use]
    pub const fn new(
        authority: Arc<StaticAuthority>,
        answer: Answer,
        delay: Duration,
        runtime: RuntimeHandle,
    ) -> Self {
        Self {
            authority,
            answer,
            delay,
            runtime,
        }
    }

    pub fn from_config(authority: Arc<StaticAuthority>, config: &PresenterConfig) -> Result<Self> {
        let runtime = RuntimeHandle::try_current()
            .map_err(|e| WardenError::NoRuntime(format!("scripted presenter: {e}")))?;
        Ok(Self::new(
            authority,
            config.answer,
            Duration::from_millis(config.delay_ms),
            runtime,
        ))
    }

    fn apply(authority: &StaticAuthority, answer: Answer, capabilities: &[Capability]) {
        for capability in capabilities {
            match answer {
                Answer::Grant => authority.grant(capability),
                Answer::Deny => authority.revoke(capability),
                Answer::DenyPermanently => authority.deny_permanently(capability),
                Answer::Fail | Answer::Abandon => {}
            }
        }
    }
}

impl ConsentPresenter for ScriptedPresenter {
    fn present(
        &self,
        capabilities: &[Capability],
        completion: ConsentCompletion,
    ) -> std::result::Result<(), PresentError> {
        if self.answer == Answer::Fail {
            return Err(PresentError::Unavailable(
                "scripted presenter configured to fail".to_string(),
            ));
        }

        let authority = Arc::clone(&self.authority);
        let answer = self.answer;
        let delay = self.delay;
        let capabilities = capabilities.to_vec();

        self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            tracing::debug!(?answer, count = capabilities.len(), "Scripted consent answered");
            Self::apply(&authority, answer, &capabilities);
            if answer == Answer::Abandon {
                drop(completion);
            } else {
                completion.complete();
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::authority::CapabilityAuthority;
    use crate::capability::presenter::CompletionSignal;
    use tokio::sync::oneshot;

    fn presenter(answer: Answer) -> (ScriptedPresenter, Arc<StaticAuthority>) {
        let authority = Arc::new(StaticAuthority::new());
        let presenter = ScriptedPresenter::new(
            Arc::clone(&authority),
            answer,
            Duration::from_millis(5),
            RuntimeHandle::current(),
        );
        (presenter, authority)
    }

    fn completion() -> (ConsentCompletion, oneshot::Receiver<CompletionSignal>) {
        let (tx, rx) = oneshot::channel();
        let tx = parking_lot::Mutex::new(Some(tx));
        let completion = ConsentCompletion::new(move |signal| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(signal);
            }
        });
        (completion, rx)
    }

    #[tokio::test]
    async fn test_grant_answer() {
        let (presenter, authority) = presenter(Answer::Grant);
        let mic = Capability::new("mic").unwrap();
        let (completion, rx) = completion();

        presenter.present(&[mic.clone()], completion).unwrap();
        assert_eq!(rx.await.unwrap(), CompletionSignal::Finished);
        assert!(authority.is_granted(&mic));
    }

    #[tokio::test]
    async fn test_deny_permanently_answer() {
        let (presenter, authority) = presenter(Answer::DenyPermanently);
        let mic = Capability::new("mic").unwrap();
        let (completion, rx) = completion();

        presenter.present(&[mic.clone()], completion).unwrap();
        rx.await.unwrap();
        assert!(!authority.is_granted(&mic));
        assert!(!authority.will_show_rationale(&mic));
    }

    #[tokio::test]
    async fn test_abandon_answer() {
        let (presenter, _authority) = presenter(Answer::Abandon);
        let (completion, rx) = completion();

        presenter
            .present(&[Capability::new("mic").unwrap()], completion)
            .unwrap();
        assert_eq!(rx.await.unwrap(), CompletionSignal::Abandoned);
    }

    #[tokio::test]
    async fn test_fail_answer() {
        let (presenter, _authority) = presenter(Answer::Fail);
        let (completion, _rx) = completion();
        assert!(
            presenter
                .present(&[Capability::new("mic").unwrap()], completion)
                .is_err()
        );
    }
}
