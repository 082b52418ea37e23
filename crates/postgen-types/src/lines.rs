//! Newline splitting for chunked byte streams.

use thiserror::Error;

/// Longest line accepted before the buffer gives up on it
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Line exceeded {limit} bytes without a terminator, dropped {dropped} bytes")]
pub struct LineOverflow {
    pub limit: usize,
    pub dropped: usize,
}

/// Carry-over buffer that yields only `\n`-terminated lines.
///
/// Works on raw bytes so a UTF-8 sequence cut between two reads is rejoined
/// before anyone decodes it. Terminators are stripped, a trailing `\r` is
/// left to the caller. A line growing past the limit is reported once as
/// `LineOverflow` and the rest of it is skipped up to the next `\n`.
#[derive(Debug)]
pub struct LineBuffer {
    carry: Vec<u8>,
    max_line: usize,
    skipping: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            carry: Vec::new(),
            max_line,
            skipping: false,
        }
    }

    /// Feed one chunk and return every line it completes, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Vec<u8>, LineOverflow>> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let head = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.skipping {
                self.skipping = false;
                continue;
            }
            if self.carry.len() + head.len() > self.max_line {
                lines.push(Err(self.overflow(head.len())));
                continue;
            }

            self.carry.extend_from_slice(head);
            lines.push(Ok(std::mem::take(&mut self.carry)));
        }

        if self.skipping {
            return lines;
        }
        if self.carry.len() + rest.len() > self.max_line {
            lines.push(Err(self.overflow(rest.len())));
            self.skipping = true;
        } else {
            self.carry.extend_from_slice(rest);
        }

        lines
    }

    /// Bytes waiting for a terminator
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carry.is_empty()
    }

    /// End of input. Returns the number of unterminated bytes dropped.
    pub fn finish(self) -> usize {
        self.carry.len()
    }

    fn overflow(&mut self, incoming: usize) -> LineOverflow {
        let dropped = self.carry.len() + incoming;
        self.carry.clear();
        LineOverflow {
            limit: self.max_line,
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(line: &str) -> Result<Vec<u8>, LineOverflow> {
        Ok(line.as_bytes().to_vec())
    }

    #[test]
    fn test_splits_complete_lines() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b"line1\nline2\n"), vec![ok("line1"), ok("line2")]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_line_carried_over() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"partial").is_empty());
        assert_eq!(buffer.pending(), 7);

        assert_eq!(buffer.push(b" line\nnext"), vec![ok("partial line")]);
        assert_eq!(buffer.finish(), 4);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut buffer = LineBuffer::new();
        let text = "café\n".as_bytes();

        assert!(buffer.push(&text[..4]).is_empty());
        assert_eq!(buffer.push(&text[4..]), vec![ok("café")]);
    }

    #[test]
    fn test_oversized_line_in_one_chunk() {
        let mut buffer = LineBuffer::with_max_line(4);
        let lines = buffer.push(b"abcdefgh\nok\n");

        assert_eq!(
            lines,
            vec![Err(LineOverflow { limit: 4, dropped: 8 }), ok("ok")]
        );
    }

    #[test]
    fn test_unterminated_growth_is_capped() {
        let mut buffer = LineBuffer::with_max_line(4);
        assert!(buffer.push(b"abc").is_empty());

        let lines = buffer.push(b"def");
        assert_eq!(lines, vec![Err(LineOverflow { limit: 4, dropped: 6 })]);
        assert_eq!(buffer.pending(), 0);

        // The tail of the oversized line is skipped without a second report
        assert!(buffer.push(b"ghijkl").is_empty());
        assert_eq!(buffer.pending(), 0);
        assert_eq!(buffer.push(b"mn\nok\n"), vec![ok("ok")]);
    }
}
