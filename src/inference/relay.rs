//! Streaming relay from Ollama to the client
//!
//! A relay runs `Idle -> Streaming -> {Completed | Errored}` and is consumed
//! as a lazy stream of [`RelayEvent`]s. Exactly one terminal event (`Done` or
//! `Error`) is produced, after which the stream ends. Dropping the stream
//! drops the outbound response, which closes the backend connection.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::client::{InferenceClient, InferenceError};
use super::decoder::{GenerateChunk, NdjsonDecoder};
use super::event::RelayEvent;

/// A generation to relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
}

/// Flatten a system/user pair into the single prompt Ollama receives
pub fn format_prompt(system_prompt: &str, user_prompt: &str) -> String {
    format!("System: {}\n\nUser: {}", system_prompt, user_prompt)
}

/// Relay one generation. No retries: a failed stream ends with `Error`.
pub fn relay(
    client: InferenceClient,
    request: GenerateRequest,
) -> impl Stream<Item = RelayEvent> + Send + 'static {
    async_stream::stream! {
        let prompt = format_prompt(&request.system_prompt, &request.user_prompt);

        let response = match client.start_generation(&request.model, &prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Generation with {} failed to start: {}", request.model, e);
                yield RelayEvent::error(e.to_string());
                return;
            }
        };

        let mut body = Box::pin(response.bytes_stream());
        let mut decoder = NdjsonDecoder::new();
        let mut forwarded = 0usize;

        loop {
            let (lines, eof) = match body.next().await {
                Some(Ok(bytes)) => (decoder.push(&bytes), false),
                Some(Err(e)) => {
                    let e = InferenceError::from(e);
                    warn!("Generation with {} broke after {} chunks: {}", request.model, forwarded, e);
                    yield RelayEvent::error(e.to_string());
                    return;
                }
                None => (decoder.finish().into_iter().collect::<Vec<_>>(), true),
            };

            for line in lines {
                for event in events_for_line(&line) {
                    let terminal = event.is_terminal();
                    if !terminal {
                        forwarded += 1;
                    }
                    yield event;
                    if terminal {
                        debug!("Generation with {} finished after {} chunks", request.model, forwarded);
                        return;
                    }
                }
            }

            if eof {
                warn!("Ollama closed the stream for {} without completing", request.model);
                yield RelayEvent::error(
                    InferenceError::Unreachable("stream ended before completion".to_string())
                        .to_string(),
                );
                return;
            }
        }
    }
}

/// Events produced by one backend line, in order.
fn events_for_line(line: &str) -> Vec<RelayEvent> {
    let Some(chunk) = GenerateChunk::parse(line) else {
        if !line.trim().is_empty() {
            debug!("Skipping malformed Ollama chunk: {}", line);
        }
        return Vec::new();
    };

    if let Some(error) = chunk.error {
        return vec![RelayEvent::error(format!("Ollama error: {}", error))];
    }

    let mut events = Vec::with_capacity(2);
    if let Some(text) = chunk.response.filter(|t| !t.is_empty()) {
        events.push(RelayEvent::text(text));
    }
    if chunk.done {
        events.push(RelayEvent::done());
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_prompt() {
        assert_eq!(
            format_prompt("Be terse.", "Hi"),
            "System: Be terse.\n\nUser: Hi"
        );
    }

    #[test]
    fn test_events_for_line() {
        assert_eq!(events_for_line("{\"response\":\"Hel\"}"), vec![RelayEvent::text("Hel")]);
        assert_eq!(
            events_for_line("{\"response\":\"!\",\"done\":true}"),
            vec![RelayEvent::text("!"), RelayEvent::done()]
        );
        assert_eq!(events_for_line("{\"response\":\"\",\"done\":true}"), vec![RelayEvent::done()]);
        assert!(events_for_line("not json").is_empty());
        assert!(events_for_line("{\"model\":\"x\"}").is_empty());
        assert_eq!(
            events_for_line("{\"error\":\"out of memory\"}"),
            vec![RelayEvent::error("Ollama error: out of memory")]
        );
    }
}
