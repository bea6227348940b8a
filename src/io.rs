//! Inbound event stream abstraction
//!
//! The host application is a thin stand-in for the map/location
//! collaborators: it feeds the engine a JSON-lines stream of tagged events
//! (position samples, fence edits, acknowledgments), one object per line.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::engine::Event;

/// Abstraction over the inbound event stream for dependency injection
#[async_trait]
pub trait EventSource: Send {
    /// Next event, or `None` when the stream ends
    async fn next_event(&mut self) -> crate::Result<Option<Event>>;
}

/// Reads serde-tagged events from a line-oriented reader.
///
/// Malformed lines are logged and skipped; a bad collaborator message must
/// never corrupt monitor state.
pub struct JsonLinesEventSource<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: tokio::io::AsyncRead + Send + Unpin> JsonLinesEventSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }
}

impl JsonLinesEventSource<tokio::io::Stdin> {
    /// Production source reading from stdin
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

#[async_trait]
impl<R: tokio::io::AsyncRead + Send + Unpin> EventSource for JsonLinesEventSource<R> {
    async fn next_event(&mut self) -> crate::Result<Option<Event>> {
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => {
                    tracing::warn!("Skipping malformed event line: {}", e);
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    #[tokio::test]
    async fn reads_events_line_by_line() {
        let input = concat!(
            r#"{"type":"position","latitude":0.0,"longitude":0.005}"#,
            "\n",
            r#"{"type":"acknowledge"}"#,
            "\n",
        );
        let mut source = JsonLinesEventSource::new(input.as_bytes());

        assert_eq!(
            source.next_event().await.unwrap(),
            Some(Event::Position {
                position: Coordinate::new(0.0, 0.005)
            })
        );
        assert_eq!(source.next_event().await.unwrap(), Some(Event::Acknowledge));
        assert_eq!(source.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn skips_malformed_and_blank_lines() {
        let input = concat!(
            "not json\n",
            "\n",
            r#"{"type":"set_radius"}"#,
            "\n",
            r#"{"type":"set_radius","radius_meters":750}"#,
            "\n",
        );
        let mut source = JsonLinesEventSource::new(input.as_bytes());

        assert_eq!(
            source.next_event().await.unwrap(),
            Some(Event::SetRadius {
                radius_meters: 750.0
            })
        );
        assert_eq!(source.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_stream_yields_none() {
        let mut source = JsonLinesEventSource::new(&b""[..]);
        assert_eq!(source.next_event().await.unwrap(), None);
    }
}
