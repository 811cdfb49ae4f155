//! Streaming response aggregation for agent runs.
//!
//! ```text
//! bytes ──► FrameStream ──► EventEnvelope ──► Reducer ──► AssistantMessage
//! ```

mod decoder;
mod event;
mod reducer;

use std::pin::Pin;

use futures::{Stream, StreamExt};

pub use decoder::{DONE_SENTINEL, FrameDecoder, FrameStream};
pub use event::{EventEnvelope, StreamEvent};
pub use reducer::{
    AssistantMessage, Citation, DEFAULT_KNOWLEDGE_TOOL, Reducer, ToolCallState, ToolResult,
    ToolStatus, citations_from_references, decode_tool_result, derive_citations,
};

use super::{Error, Result};

/// Stream of typed run events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Decode a run response body into typed events.
///
/// Frames that are not tracked events are skipped; a transport error is
/// yielded once and ends the stream.
pub fn event_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    let frames = FrameStream::new(bytes);

    let stream = async_stream::stream! {
        futures::pin_mut!(frames);

        while let Some(frame) = frames.next().await {
            match frame {
                Ok(frame) => {
                    if let Some(envelope) = EventEnvelope::from_frame(&frame) {
                        yield Ok(envelope);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_become_typed_events() {
        let body = concat!(
            "data: {\"event\":\"RunStarted\",\"session_id\":\"s1\"}\n\n",
            "data: {\"event\":\"RunContent\",\"content\":\"Hi\",\"session_id\":\"s1\"}\n\n",
            "data: {\"event\":\"RunCompleted\",\"session_id\":\"s1\"}\n\n",
        );
        let chunks: Vec<std::result::Result<&'static [u8], std::io::Error>> = body
            .as_bytes()
            .chunks(5)
            .map(Ok)
            .collect();

        let events: Vec<_> = event_stream(futures::stream::iter(chunks))
            .map(|e| e.unwrap().event)
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::ContentDelta { text: "Hi".into() },
                StreamEvent::RunCompleted,
            ]
        );
    }
}
