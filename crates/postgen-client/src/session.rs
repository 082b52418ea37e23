use postgen_types::{Fragment, GenerationState, Prompt};
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::reader::RelayClient;

/// Prefix of the text shown when a generation fails
pub const ERROR_PREFIX: &str = "Error generating post: ";

/// Owns the accumulated text of the current generation and its state.
///
/// Every run starts from an empty buffer, so nothing from a previous
/// request leaks into the next one.
pub struct GenerationSession {
    client: RelayClient,
    text: String,
    state: GenerationState,
}

impl GenerationSession {
    pub fn new(client: RelayClient) -> Self {
        Self {
            client,
            text: String::new(),
            state: GenerationState::Idle,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    /// Stream a generation, calling `on_update` after each fragment is appended
    /// with the fragment and the text accumulated so far.
    pub async fn run_streaming<F>(
        &mut self,
        prompt: &Prompt,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&Fragment, &str),
    {
        self.state.begin()?;
        self.text.clear();

        let text = &mut self.text;
        let state = &mut self.state;
        let mut transition = Ok(());
        let result = self
            .client
            .stream_generate(prompt, cancel, |fragment| {
                if transition.is_ok() {
                    transition = state.first_fragment();
                }
                text.push_str(&fragment.content);
                on_update(fragment, text.as_str());
            })
            .await;
        transition?;

        match result {
            Ok(fragments) => {
                tracing::debug!(fragments, chars = self.text.len(), "Generation streamed");
                self.state.complete()?;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Wait for the whole completion, then display it
    pub async fn run_blocking(
        &mut self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        self.state.begin()?;
        self.text.clear();

        match self.client.generate(prompt, cancel).await {
            Ok(text) => {
                self.text = text;
                self.state.complete()?;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: ClientError) -> Result<(), ClientError> {
        let message = error.to_string();
        self.text = format!("{ERROR_PREFIX}{message}");
        self.state.fail(message)?;
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        format!("http://127.0.0.1:{port}")
    }

    #[tokio::test]
    async fn test_unreachable_relay_replaces_text_with_error() {
        let client = RelayClient::new(closed_port_url()).unwrap();
        let mut session = GenerationSession::new(client);
        let prompt = Prompt::raw("hello");

        let result = session
            .run_streaming(&prompt, &CancellationToken::new(), |_, _| {})
            .await;

        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert!(session.text().starts_with(ERROR_PREFIX));
        assert!(matches!(session.state(), GenerationState::Errored(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let client = RelayClient::new(closed_port_url()).unwrap();
        let mut session = GenerationSession::new(client);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = session.run_blocking(&Prompt::raw("hello"), &cancel).await;

        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert_eq!(session.text(), "Error generating post: Generation cancelled");
    }
}
