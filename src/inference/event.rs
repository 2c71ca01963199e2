//! Events emitted downstream by the relay

use serde::{Deserialize, Serialize};
use serde_json::json;

/// One server-sent event.
///
/// Serialises to `{"text": ...}`, `{"done": true}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayEvent {
    Text { text: String },
    Done { done: bool },
    Error { error: String },
}

impl RelayEvent {
    pub fn text(text: impl Into<String>) -> Self {
        RelayEvent::Text { text: text.into() }
    }

    pub fn done() -> Self {
        RelayEvent::Done { done: true }
    }

    pub fn error(error: impl Into<String>) -> Self {
        RelayEvent::Error {
            error: error.into(),
        }
    }

    /// `Done` and `Error` end the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelayEvent::Text { .. })
    }

    pub fn to_json(&self) -> String {
        match self {
            RelayEvent::Text { text } => json!({ "text": text }),
            RelayEvent::Done { done } => json!({ "done": done }),
            RelayEvent::Error { error } => json!({ "error": error }),
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_payloads() {
        assert_eq!(RelayEvent::text("Hel").to_json(), "{\"text\":\"Hel\"}");
        assert_eq!(RelayEvent::done().to_json(), "{\"done\":true}");
        assert_eq!(RelayEvent::error("boom").to_json(), "{\"error\":\"boom\"}");
    }

    #[test]
    fn test_parse_back() {
        let event: RelayEvent = serde_json::from_str("{\"done\":true}").unwrap();
        assert_eq!(event, RelayEvent::done());
        assert!(event.is_terminal());
        assert!(!RelayEvent::text("x").is_terminal());
    }
}
