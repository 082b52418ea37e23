use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use postgen_types::LineBuffer;

use crate::traits::DeltaStream;

/// One incremental unit from an upstream streaming session.
///
/// `content` is `None` (or empty) for role-only and metadata-only chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

impl Delta {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: None,
        }
    }

    /// Non-empty text carried by this delta
    pub fn non_empty_text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: ChoiceDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceDelta {
    pub role: Option<String>,
    pub content: Option<String>,
}

impl ChatStreamChunk {
    fn to_delta(&self) -> Delta {
        match self.choices.first() {
            Some(choice) => Delta {
                content: choice.delta.content.clone(),
                finish_reason: choice.finish_reason.clone(),
            },
            None => Delta::default(),
        }
    }
}

/// Convert an upstream chat-completion SSE body into a stream of deltas.
///
/// Every `data:` chunk yields exactly one delta, including empty ones. The
/// stream ends at `data: [DONE]` or when the body ends.
pub fn parse_chat_sse_stream<S, B, E>(body: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(body);
        let mut buffer = LineBuffer::new();

        'read: while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    for line_result in buffer.push(bytes.as_ref()) {
                        let line = match line_result
                            .map_err(anyhow::Error::from)
                            .and_then(|raw| String::from_utf8(raw).context("Invalid UTF-8 in upstream line"))
                        {
                            Ok(line) => line,
                            Err(e) => {
                                yield Err(e);
                                continue;
                            }
                        };
                        let line = line.trim();

                        if line.is_empty() {
                            continue;
                        }

                        if let Some(data) = line.strip_prefix("data:") {
                            let data = data.trim_start();
                            if data == "[DONE]" {
                                break 'read;
                            }

                            match serde_json::from_str::<ChatStreamChunk>(data) {
                                Ok(chunk) => yield Ok(chunk.to_delta()),
                                Err(e) => yield Err(anyhow::anyhow!("Failed to parse chat chunk: {}", e)),
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    break;
                }
            }
        }

        let dropped = buffer.finish();
        if dropped > 0 {
            tracing::debug!(dropped, "Discarding unterminated upstream line");
        }
    })
}
