//! Server-sent-event framing for relay payloads.
//!
//! Each event is one `data:` line holding a JSON payload followed by a blank
//! line. The relay never emits any other field, and the end of the stream is
//! signalled only by the transport closing.

use crate::fragment::RelayPayload;
use crate::lines::{LineBuffer, LineOverflow};

pub const DATA_MARKER: &str = "data:";

/// Frame one payload as `data:<json>\n\n`
pub fn encode_event(payload: &RelayPayload) -> serde_json::Result<String> {
    let json = serde_json::to_string(payload)?;
    Ok(format!("{DATA_MARKER}{json}\n\n"))
}

/// Outcome of one complete `data:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    Payload(RelayPayload),
    Malformed { line: String, error: String },
    /// Line dropped for exceeding the buffer limit
    Oversized(LineOverflow),
}

/// Incremental SSE decoder.
///
/// Only newline-terminated lines are decoded; an unterminated tail is held
/// back until the next `push`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    lines: LineBuffer,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            lines: LineBuffer::with_max_line(max_line),
        }
    }

    /// Feed one chunk and decode every line it completes, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedLine> {
        self.lines
            .push(chunk)
            .into_iter()
            .filter_map(|line| match line {
                Ok(raw) => decode_line(&raw),
                Err(overflow) => Some(DecodedLine::Oversized(overflow)),
            })
            .collect()
    }

    /// Bytes waiting for a line terminator
    pub fn pending(&self) -> usize {
        self.lines.pending()
    }

    /// End of input. Returns the number of unterminated bytes dropped.
    pub fn finish(self) -> usize {
        self.lines.finish()
    }
}

fn decode_line(raw: &[u8]) -> Option<DecodedLine> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => {
            return Some(DecodedLine::Malformed {
                line: String::from_utf8_lossy(raw).into_owned(),
                error: e.to_string(),
            })
        }
    };

    let payload = line.strip_prefix(DATA_MARKER)?.trim();
    if payload.is_empty() {
        return None;
    }

    Some(match serde_json::from_str::<RelayPayload>(payload) {
        Ok(parsed) => DecodedLine::Payload(parsed),
        Err(e) => DecodedLine::Malformed {
            line: payload.to_string(),
            error: e.to_string(),
        },
    })
}
