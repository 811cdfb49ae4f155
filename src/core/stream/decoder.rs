//! Line framing for `data:`-prefixed JSON run streams.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::Stream;
use pin_project_lite::pin_project;
use serde_json::Value;

use crate::core::secret::mask_secrets;
use crate::core::{Error, Result};

const DATA_PREFIX: &str = "data:";

/// End-of-stream marker some servers send before closing.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental line buffer.
///
/// Bytes are buffered rather than text so a chunk boundary inside a
/// multi-byte character cannot corrupt the line it belongs to.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        let searched = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer[searched..]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|pos| searched + pos)
        else {
            return Vec::new();
        };

        let complete: Vec<u8> = self.buffer.drain(..=last_newline).collect();
        complete
            .split(|&b| b == b'\n')
            .filter_map(parse_line)
            .collect()
    }

    /// Number of bytes held back waiting for a newline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop an unterminated trailing line at transport close.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "discarding unterminated line at end of stream"
            );
            self.buffer.clear();
        }
    }
}

/// Parse one line (without its `\n`) into a frame.
fn parse_line(line: &[u8]) -> Option<Value> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.is_empty() {
        return None;
    }

    let Ok(line) = std::str::from_utf8(line) else {
        tracing::debug!(bytes = line.len(), "dropping non-UTF-8 stream line");
        return None;
    };

    // `event:`, `id:` and `:` comment lines carry nothing we use
    let data = line.strip_prefix(DATA_PREFIX)?;
    let data = data.strip_prefix(' ').unwrap_or(data).trim_end();

    if data.is_empty() || data == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str(data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(data = %mask_secrets(data), error = %e, "dropping malformed stream line");
            None
        }
    }
}

pin_project! {
    /// Stream adapter yielding one JSON value per complete `data:` line.
    ///
    /// A transport error is yielded once and ends the stream.
    pub struct FrameStream<S> {
        #[pin]
        inner: S,
        decoder: FrameDecoder,
        ready: VecDeque<Value>,
        done: bool,
    }
}

impl<S> FrameStream<S> {
    /// Wrap a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }
}

impl<S, B, E> Stream for FrameStream<S>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    type Item = Result<Value>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(frame) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if *this.done {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.ready.extend(this.decoder.push(chunk.as_ref())),
                Some(Err(e)) => {
                    *this.done = true;
                    this.decoder.finish();
                    return Poll::Ready(Some(Err(e.into())));
                }
                None => {
                    *this.done = true;
                    this.decoder.finish();
                }
            }
        }
    }
}
