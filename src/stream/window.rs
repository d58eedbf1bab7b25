//! Byte window over a chunked download
//!
//! [`ByteWindow`] turns a backend chunk stream into exactly `len` bytes:
//! it truncates the chunk that crosses the end of the window and stops
//! polling the backend once the window is full. The stream is lazy, so
//! when the HTTP body is dropped (client gone) nothing more is pulled.

use crate::connector::ChunkStream;
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::OwnedSemaphorePermit;

/// Exactly-`len`-bytes view over a backend chunk stream
pub struct ByteWindow {
    inner: ChunkStream,
    lesson_id: i64,
    expected: u64,
    remaining: u64,
    done: bool,
    _permit: Option<OwnedSemaphorePermit>,
}

impl ByteWindow {
    pub fn new(inner: ChunkStream, len: u64, lesson_id: i64) -> Self {
        Self {
            inner,
            lesson_id,
            expected: len,
            remaining: len,
            done: false,
            _permit: None,
        }
    }

    /// Hold a download slot for as long as the window lives
    pub fn with_permit(mut self, permit: Option<OwnedSemaphorePermit>) -> Self {
        self._permit = permit;
        self
    }

    /// Bytes emitted so far
    pub fn emitted(&self) -> u64 {
        self.expected - self.remaining
    }

    fn fail(&mut self, kind: io::ErrorKind, message: String) -> Poll<Option<io::Result<Bytes>>> {
        tracing::error!(
            lesson = self.lesson_id,
            sent = self.emitted(),
            expected = self.expected,
            "Stream aborted: {}",
            message
        );
        self.done = true;
        self._permit = None;
        Poll::Ready(Some(Err(io::Error::new(kind, message))))
    }
}

impl Stream for ByteWindow {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }
        if this.remaining == 0 {
            this.done = true;
            this._permit = None;
            return Poll::Ready(None);
        }

        loop {
            return match this.inner.as_mut().poll_next(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Some(Ok(mut chunk))) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    if chunk.len() as u64 > this.remaining {
                        chunk.truncate(this.remaining as usize);
                    }
                    this.remaining -= chunk.len() as u64;
                    Poll::Ready(Some(Ok(chunk)))
                }
                Poll::Ready(Some(Err(e))) => this.fail(io::ErrorKind::Other, e.to_string()),
                Poll::Ready(None) => this.fail(
                    io::ErrorKind::UnexpectedEof,
                    format!("backend ended {} bytes early", this.remaining),
                ),
            };
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done || self.remaining == 0 {
            (0, Some(0))
        } else {
            (1, None)
        }
    }
}

impl Drop for ByteWindow {
    fn drop(&mut self) {
        if !self.done && self.remaining > 0 {
            tracing::debug!(
                lesson = self.lesson_id,
                sent = self.emitted(),
                expected = self.expected,
                "Client went away, download cancelled"
            );
        }
    }
}
