//! HTTP body over buffered content.
//!
//! [`ContentBody`] hands buffered content to any `http_body::Body` consumer,
//! one data frame per buffer segment.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Frame, SizeHint};

/// Body streamed from the segments of buffered content.
#[derive(Debug, Default)]
pub struct ContentBody {
    chunks: VecDeque<Bytes>,
    remaining: u64,
}

impl ContentBody {
    /// A body yielding `chunks` in order; empty chunks are skipped.
    #[must_use]
    pub fn from_chunks(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        let chunks: VecDeque<Bytes> = chunks.into_iter().filter(|c| !c.is_empty()).collect();
        let remaining = chunks.iter().map(|c| c.len() as u64).sum();
        Self { chunks, remaining }
    }

    /// A body with no content.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl http_body::Body for ContentBody {
    type Data = Bytes;
    type Error = std::convert::Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let Some(chunk) = this.chunks.pop_front() else {
            return Poll::Ready(None);
        };
        this.remaining -= chunk.len() as u64;
        Poll::Ready(Some(Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.chunks.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining)
    }
}
