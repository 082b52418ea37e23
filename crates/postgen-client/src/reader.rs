use futures::{Stream, StreamExt};
use postgen_types::{
    DecodedLine, FailureResponse, Fragment, GenerateRequest, GenerateResponse, Prompt,
    RelayPayload, SseDecoder,
};
use reqwest::header::CONTENT_TYPE;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, ClientError>> + Send>>;

/// HTTP client for the relay endpoints
#[derive(Debug, Clone)]
pub struct RelayClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into();
        reqwest::Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;

        let http_client = reqwest::Client::builder().build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a streaming generation and yield fragments as their lines complete.
    ///
    /// Malformed lines are logged and skipped. A terminal error event ends the
    /// stream with `ClientError::Interrupted`; cancellation ends it with
    /// `ClientError::Cancelled`.
    pub fn fragments(&self, prompt: &Prompt, cancel: CancellationToken) -> FragmentStream {
        let request = self
            .http_client
            .post(format!("{}/api/chat_stream", self.base_url))
            .json(&GenerateRequest::new(prompt.as_str()));

        Box::pin(async_stream::stream! {
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ClientError::Cancelled),
                sent = request.send() => sent.map_err(ClientError::from),
            };
            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let response = match check_status(response, true).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut body = Box::pin(response.bytes_stream());
            let mut decoder = SseDecoder::new();

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    next = body.next() => Some(next),
                };

                let chunk = match next {
                    None => {
                        yield Err(ClientError::Cancelled);
                        return;
                    }
                    Some(Some(Ok(chunk))) => chunk,
                    Some(Some(Err(e))) => {
                        yield Err(ClientError::from(e));
                        return;
                    }
                    Some(None) => break,
                };

                for line in decoder.push(&chunk) {
                    // One chunk can carry many events; none may surface after cancel
                    if cancel.is_cancelled() {
                        yield Err(ClientError::Cancelled);
                        return;
                    }
                    match line {
                        DecodedLine::Payload(RelayPayload::Fragment(fragment)) => yield Ok(fragment),
                        DecodedLine::Payload(RelayPayload::Failure { error }) => {
                            yield Err(ClientError::Interrupted(error));
                            return;
                        }
                        DecodedLine::Malformed { line, error } => {
                            tracing::warn!(%line, %error, "Failed to parse JSON from stream line");
                        }
                        DecodedLine::Oversized(overflow) => {
                            tracing::warn!(%overflow, "Skipped oversized stream line");
                        }
                    }
                }
            }

            let dropped = decoder.finish();
            if dropped > 0 {
                tracing::debug!(dropped, "Discarded unterminated line at end of stream");
            }
        })
    }

    /// Drive `fragments` to completion, handing each fragment to `on_fragment`
    /// in arrival order. Returns the number of fragments delivered.
    pub async fn stream_generate<F>(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
        mut on_fragment: F,
    ) -> Result<usize, ClientError>
    where
        F: FnMut(&Fragment),
    {
        let mut fragments = self.fragments(prompt, cancel.clone());
        let mut delivered = 0;

        while let Some(fragment) = fragments.next().await {
            on_fragment(&fragment?);
            delivered += 1;
        }

        Ok(delivered)
    }

    /// Non-streaming generation; resolves once the whole completion is ready
    pub async fn generate(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<String, ClientError> {
        let request = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .json(&GenerateRequest::new(prompt.as_str()));

        let exchange = async {
            let response = check_status(request.send().await?, false).await?;
            let bytes = response.bytes().await?;
            parse_generate_body(&bytes)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = exchange => result,
        }
    }
}

/// Turn non-2xx responses into `ClientError::Relay`. On the stream endpoint a
/// JSON body sent with a 2xx status is also a failure.
async fn check_status(
    response: reqwest::Response,
    event_stream: bool,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    if status.is_success() && !(event_stream && is_json) {
        return Ok(response);
    }

    let body = response.bytes().await?;
    match serde_json::from_slice::<FailureResponse>(&body) {
        Ok(failure) => Err(ClientError::Relay {
            status: failure.status,
            message: failure.error,
        }),
        Err(_) if status.is_success() => Err(ClientError::Relay {
            status: status.as_u16(),
            message: "Unexpected JSON body on stream endpoint".to_string(),
        }),
        Err(_) => Err(ClientError::Relay {
            status: status.as_u16(),
            message: String::from_utf8_lossy(&body).into_owned(),
        }),
    }
}

fn parse_generate_body(bytes: &[u8]) -> Result<String, ClientError> {
    if let Ok(success) = serde_json::from_slice::<GenerateResponse>(bytes) {
        return Ok(success.response);
    }
    match serde_json::from_slice::<FailureResponse>(bytes) {
        Ok(failure) => Err(ClientError::Relay {
            status: failure.status,
            message: failure.error,
        }),
        Err(e) => Err(ClientError::Relay {
            status: 200,
            message: format!("Unreadable response: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            RelayClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = RelayClient::new("http://127.0.0.1:3000/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
    }

    #[test]
    fn test_parse_generate_body_success() {
        let text = parse_generate_body(br#"{"response":"Hi","status":200}"#).unwrap();
        assert_eq!(text, "Hi");
    }

    #[test]
    fn test_parse_generate_body_failure_with_ok_status() {
        let err = parse_generate_body(br#"{"Error":"Failed to process Request","status":500}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Relay { status: 500, ref message } if message == "Failed to process Request"
        ));
    }
}
