//! Line framing for Ollama's newline-delimited JSON stream

use serde::Deserialize;

/// One line of an Ollama `/api/generate` stream
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerateChunk {
    /// Parse a single line. Blank or malformed lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        serde_json::from_str(line).ok()
    }
}

/// Longest line accepted from the backend, newline excluded
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits arbitrary byte chunks into complete lines.
///
/// Transport chunks do not line up with JSON objects: one chunk may hold
/// several lines, and a line may straddle chunks. Lines longer than the
/// limit are dropped as malformed, so the buffer never holds more than
/// one limit's worth of bytes.
#[derive(Debug)]
pub struct NdjsonDecoder {
    buf: Vec<u8>,
    max_line_bytes: usize,
    /// Inside an oversized line; skip until the next newline
    discarding: bool,
}

impl Default for NdjsonDecoder {
    fn default() -> Self {
        Self::with_max_line_bytes(MAX_LINE_BYTES)
    }
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    /// Feed bytes, returning every line completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos + 1);
            rest = tail;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if self.buf.len() + pos > self.max_line_bytes {
                tracing::debug!("Skipping oversized line from Ollama");
                self.buf.clear();
                continue;
            }
            self.buf.extend_from_slice(head);
            lines.push(decode_line(&std::mem::take(&mut self.buf)));
        }

        if !self.discarding {
            if self.buf.len() + rest.len() > self.max_line_bytes {
                tracing::debug!("Skipping oversized line from Ollama");
                self.buf.clear();
                self.discarding = true;
            } else {
                self.buf.extend_from_slice(rest);
            }
        }
        lines
    }

    /// Whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        if std::mem::take(&mut self.discarding) || self.buf.is_empty() {
            self.buf.clear();
            return None;
        }
        let line = decode_line(&std::mem::take(&mut self.buf));
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}
