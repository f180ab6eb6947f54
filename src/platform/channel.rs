use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::capability::presenter::{ConsentCompletion, ConsentPresenter, PresentError};
use crate::capability::types::Capability;

/// A consent prompt waiting for a UI to handle it.
#[derive(Debug)]
pub struct ConsentPrompt {
    pub capabilities: Vec<Capability>,
    pub completion: ConsentCompletion,
}

/// Forwards prompts to whatever loop owns the receiving end.
pub struct ChannelPresenter {
    prompt_tx: UnboundedSender<ConsentPrompt>,
}

impl ChannelPresenter {
    #[must_use]
    pub const fn new(prompt_tx: UnboundedSender<ConsentPrompt>) -> Self {
        Self { prompt_tx }
    }

    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<ConsentPrompt>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ConsentPresenter for ChannelPresenter {
    fn present(
        &self,
        capabilities: &[Capability],
        completion: ConsentCompletion,
    ) -> Result<(), PresentError> {
        self.prompt_tx
            .send(ConsentPrompt {
                capabilities: capabilities.to_vec(),
                completion,
            })
            .map_err(|_| PresentError::NoActiveContext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_forwarded() {
        let (presenter, mut rx) = ChannelPresenter::channel();
        let mic = Capability::new("mic").unwrap();

        presenter
            .present(&[mic.clone()], ConsentCompletion::new(|_| {}))
            .unwrap();

        let prompt = rx.try_recv().unwrap();
        assert_eq!(prompt.capabilities, vec![mic]);
        assert!(prompt.completion.complete());
    }

    #[test]
    fn test_closed_receiver_is_no_context() {
        let (presenter, rx) = ChannelPresenter::channel();
        drop(rx);
        let result = presenter.present(
            &[Capability::new("mic").unwrap()],
            ConsentCompletion::new(|_| {}),
        );
        assert!(matches!(result, Err(PresentError::NoActiveContext)));
    }
}
