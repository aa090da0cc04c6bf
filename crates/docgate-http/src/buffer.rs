//! Pooled, segmented content storage.
//!
//! Request and response content is held in fixed-size segments drawn from a
//! shared, bounded [`BufferPool`]. A [`ContentSlot`] owns at most one
//! [`BufferedContent`] at a time and is either absent (nothing buffered) or
//! present (zero or more bytes).
//!
//! ```text
//!   BufferPool (bounded, shared)
//!       |  allocate()                    drop(Segment) returns it
//!       v                                        ^
//!   ContentSlot --write/acquire--> BufferedContent [Segment, Segment, ...]
//!       |                                        |
//!       +--------------- release() -------------+
//! ```
//!
//! Segments go back to the pool when dropped, so replacing or releasing
//! content, or dropping the slot itself on any exit path, frees them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Buf, Bytes, BytesMut};
use docgate_core::DocGateConfig;
use docgate_model::error::DocGateError;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::body::ContentBody;

/// A shared, bounded pool of fixed-size byte segments.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<BytesMut>>,
    segment_size: usize,
    capacity: usize,
    in_use: AtomicUsize,
}

impl BufferPool {
    /// Create a pool of `capacity` segments of `segment_size` bytes each.
    #[must_use]
    pub fn new(segment_size: usize, capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::new()),
                segment_size: segment_size.max(1),
                capacity,
                in_use: AtomicUsize::new(0),
            }),
        }
    }

    /// Create a pool sized from the configuration.
    ///
    /// The pool always holds at least the segments of one maximum-size
    /// content, even when `pool_segments` is smaller.
    #[must_use]
    pub fn from_config(config: &DocGateConfig) -> Self {
        let per_content = config.segments_per_content();
        if config.pool_segments < per_content {
            debug!(
                pool_segments = config.pool_segments,
                per_content, "raising pool capacity to fit one maximum-size content"
            );
        }
        Self::new(config.segment_size, config.pool_segments.max(per_content))
    }

    /// Take one segment from the pool.
    pub fn allocate(&self) -> Result<Segment, DocGateError> {
        let reserved = self
            .inner
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.inner.capacity).then_some(n + 1)
            });
        if reserved.is_err() {
            warn!(capacity = self.inner.capacity, "buffer pool exhausted");
            return Err(DocGateError::pool_exhausted());
        }

        let buf = self
            .inner
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.inner.segment_size));

        Ok(Segment {
            buf,
            pool: Arc::clone(&self.inner),
        })
    }

    /// Segments currently handed out.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Segments that can still be allocated.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.capacity.saturating_sub(self.in_use())
    }

    /// Total number of segments.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Size of one segment in bytes.
    #[must_use]
    pub fn segment_size(&self) -> usize {
        self.inner.segment_size
    }
}

/// One pooled segment; returns to its pool on drop.
#[derive(Debug)]
pub struct Segment {
    buf: BytesMut,
    pool: Arc<PoolInner>,
}

impl Segment {
    fn remaining(&self) -> usize {
        self.pool.segment_size.saturating_sub(self.buf.len())
    }

    /// Bytes written to this segment.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        {
            let mut free = self.pool.free.lock();
            if free.len() < self.pool.capacity {
                free.push(buf);
            }
        }
        self.pool.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Content held in a sequence of segments.
#[derive(Debug, Default)]
pub struct BufferedContent {
    segments: Vec<Segment>,
    len: usize,
}

impl BufferedContent {
    /// Append bytes, allocating segments as needed.
    fn append(
        &mut self,
        pool: &BufferPool,
        mut data: &[u8],
        limits: ContentLimits,
    ) -> Result<(), DocGateError> {
        if self.len + data.len() > limits.max_bytes {
            return Err(DocGateError::content_too_large(limits.max_bytes));
        }

        while !data.is_empty() {
            if self.segments.last().is_none_or(|s| s.remaining() == 0) {
                if self.segments.len() >= limits.max_segments {
                    return Err(DocGateError::content_too_large(limits.max_bytes));
                }
                self.segments.push(pool.allocate()?);
            }
            let Some(segment) = self.segments.last_mut() else {
                break;
            };
            let n = segment.remaining().min(data.len());
            segment.buf.extend_from_slice(&data[..n]);
            data = &data[n..];
            self.len += n;
        }

        Ok(())
    }

    /// Content length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no bytes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of segments held.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Copy the content out as one contiguous buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.len);
        for segment in &self.segments {
            out.extend_from_slice(segment.as_slice());
        }
        out.freeze()
    }

    /// Copy the content out segment by segment.
    #[must_use]
    pub fn chunks(&self) -> Vec<Bytes> {
        self.segments
            .iter()
            .map(|s| Bytes::copy_from_slice(s.as_slice()))
            .collect()
    }
}

/// Per-content size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLimits {
    /// Largest accepted content in bytes.
    pub max_bytes: usize,
    /// Largest number of segments one content may hold.
    pub max_segments: usize,
}

impl ContentLimits {
    /// Limits for `max_bytes` of content in segments of `segment_size` bytes.
    #[must_use]
    pub fn new(max_bytes: usize, segment_size: usize) -> Self {
        Self {
            max_bytes,
            max_segments: max_bytes.div_ceil(segment_size.max(1)),
        }
    }
}

/// The content of one exchange side.
///
/// Reading is opt-in: content must have been buffered (by [`ContentSlot::write`],
/// [`ContentSlot::acquire`] or [`ContentSlot::buffer_body`]) before
/// [`ContentSlot::read`] succeeds.
#[derive(Debug)]
pub struct ContentSlot {
    pool: BufferPool,
    limits: ContentLimits,
    content: Option<BufferedContent>,
}

impl ContentSlot {
    /// Create an absent slot drawing from `pool`.
    #[must_use]
    pub fn new(pool: BufferPool, max_content_size: usize) -> Self {
        let limits = ContentLimits::new(max_content_size, pool.segment_size());
        Self {
            pool,
            limits,
            content: None,
        }
    }

    /// Create an absent slot with the configured content limits.
    #[must_use]
    pub fn from_config(pool: BufferPool, config: &DocGateConfig) -> Self {
        let limits = ContentLimits {
            max_bytes: config.max_content_size,
            max_segments: config.segments_per_content(),
        };
        Self {
            pool,
            limits,
            content: None,
        }
    }

    /// The content limits.
    #[must_use]
    pub fn limits(&self) -> ContentLimits {
        self.limits
    }

    /// Whether content is attached.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.content.is_some()
    }

    /// Ensure content is present, attaching an empty one (one segment) when
    /// absent.
    pub fn acquire(&mut self) -> Result<(), DocGateError> {
        if self.content.is_none() {
            let content = BufferedContent {
                segments: vec![self.pool.allocate()?],
                len: 0,
            };
            trace!(pool_in_use = self.pool.in_use(), "content acquired");
            self.content = Some(content);
        }
        Ok(())
    }

    /// Read the buffered content.
    pub fn read(&self) -> Result<Bytes, DocGateError> {
        self.content
            .as_ref()
            .map(BufferedContent::to_bytes)
            .ok_or_else(DocGateError::content_unavailable)
    }

    /// Replace the content.
    ///
    /// The previous segments are released before new ones are allocated.
    /// `None` leaves the slot present and empty. On failure the slot is left
    /// absent.
    pub fn write(&mut self, data: Option<&[u8]>) -> Result<(), DocGateError> {
        self.release();

        let Some(data) = data else {
            return self.acquire();
        };

        let mut content = BufferedContent::default();
        content.append(&self.pool, data, self.limits)?;
        debug!(
            bytes = content.len(),
            segments = content.segment_count(),
            pool_in_use = self.pool.in_use(),
            "content buffered"
        );
        self.content = Some(content);
        Ok(())
    }

    /// Release the content, returning its segments to the pool.
    ///
    /// Safe to call when absent.
    pub fn release(&mut self) {
        if let Some(content) = self.content.take() {
            trace!(segments = content.segment_count(), "content released");
        }
    }

    /// Stream an HTTP body into the slot, replacing any previous content.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use docgate_http::buffer::{BufferPool, ContentSlot};
    /// use http_body_util::Full;
    ///
    /// let mut slot = ContentSlot::new(BufferPool::new(4, 16), 64);
    /// tokio_test::block_on(slot.buffer_body(Full::new(Bytes::from("hello")))).unwrap();
    /// assert_eq!(slot.read().unwrap(), "hello");
    /// assert_eq!(slot.segments_held(), 2);
    /// ```
    pub async fn buffer_body<B>(&mut self, body: B) -> Result<(), DocGateError>
    where
        B: http_body::Body + Unpin,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.release();

        let mut body = body;
        let mut content = BufferedContent::default();
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| {
                let mut err = DocGateError::internal_error("failed to read the request body");
                err.source = Some(e.into());
                err
            })?;
            if let Ok(mut data) = frame.into_data() {
                let chunk = data.copy_to_bytes(data.remaining());
                content.append(&self.pool, &chunk, self.limits)?;
            }
        }

        debug!(
            bytes = content.len(),
            segments = content.segment_count(),
            "request body buffered"
        );
        self.content = Some(content);
        Ok(())
    }

    /// Segments currently held by this slot.
    #[must_use]
    pub fn segments_held(&self) -> usize {
        self.content.as_ref().map_or(0, BufferedContent::segment_count)
    }

    /// Content length, `None` when absent.
    #[must_use]
    pub fn content_len(&self) -> Option<usize> {
        self.content.as_ref().map(BufferedContent::len)
    }

    /// Turn the buffered content into an HTTP body.
    pub fn to_body(&self) -> Result<ContentBody, DocGateError> {
        self.content
            .as_ref()
            .map(|content| ContentBody::from_chunks(content.chunks()))
            .ok_or_else(DocGateError::content_unavailable)
    }

    /// The pool this slot draws from.
    #[must_use]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use docgate_model::error::DocGateErrorCode;
    use http_body_util::Full;

    use super::*;

    fn slot(segment_size: usize, capacity: usize, max: usize) -> ContentSlot {
        ContentSlot::new(BufferPool::new(segment_size, capacity), max)
    }

    #[test]
    fn test_should_size_pool_and_slot_from_config() {
        let config = DocGateConfig::builder()
            .segment_size(64)
            .max_content_size(1024)
            .pool_segments(4)
            .build();
        let pool = BufferPool::from_config(&config);
        assert_eq!(pool.capacity(), 16);

        let mut slot = ContentSlot::from_config(pool.clone(), &config);
        assert_eq!(slot.limits().max_segments, 16);

        slot.write(Some(&[b'x'; 1024][..])).unwrap();
        assert_eq!(slot.segments_held(), 16);

        let err = slot.write(Some(&[b'x'; 1025][..])).unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::ContentTooLarge);
        assert!(!slot.is_present());
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_should_keep_larger_configured_pool() {
        let config = DocGateConfig::builder()
            .segment_size(64)
            .max_content_size(128)
            .pool_segments(10)
            .build();
        assert_eq!(BufferPool::from_config(&config).capacity(), 10);
    }

    #[test]
    fn test_should_fail_read_before_buffering() {
        let slot = slot(8, 4, 32);
        let err = slot.read().unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::ContentUnavailable);
        assert!(err.message.contains("upstream"));
    }

    #[test]
    fn test_should_release_idempotently() {
        let mut slot = slot(8, 4, 32);
        slot.write(Some(b"abc")).unwrap();
        slot.release();
        slot.release();
        assert!(!slot.is_present());
        assert_eq!(slot.pool().in_use(), 0);
    }

    #[test]
    fn test_should_not_leak_on_rewrite() {
        let mut slot = slot(4, 8, 64);
        slot.write(Some(b"0123456789")).unwrap();
        assert_eq!(slot.segments_held(), 3);
        slot.write(Some(b"xy")).unwrap();
        assert_eq!(slot.segments_held(), 1);
        assert_eq!(slot.pool().in_use(), 1);
        assert_eq!(slot.read().unwrap(), "xy");
    }

    #[test]
    fn test_should_keep_slot_present_on_empty_write() {
        let mut slot = slot(4, 8, 64);
        slot.write(Some(b"data")).unwrap();
        slot.write(None).unwrap();
        assert!(slot.is_present());
        assert_eq!(slot.read().unwrap(), Bytes::new());
    }

    #[test]
    fn test_should_acquire_once() {
        let mut slot = slot(4, 8, 64);
        slot.acquire().unwrap();
        slot.acquire().unwrap();
        assert_eq!(slot.pool().in_use(), 1);
        assert_eq!(slot.content_len(), Some(0));
    }

    #[test]
    fn test_should_reject_oversized_content() {
        let mut slot = slot(4, 8, 6);
        let err = slot.write(Some(b"0123456")).unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::ContentTooLarge);
        assert!(!slot.is_present());
        assert_eq!(slot.pool().in_use(), 0);
    }

    #[test]
    fn test_should_report_pool_exhaustion_and_recover() {
        let pool = BufferPool::new(4, 2);
        let mut first = ContentSlot::new(pool.clone(), 64);
        let mut second = ContentSlot::new(pool.clone(), 64);

        first.write(Some(b"12345678")).unwrap();
        let err = second.write(Some(b"x")).unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::PoolExhausted);

        first.release();
        second.write(Some(b"x")).unwrap();
        assert_eq!(pool.in_use(), 1);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_should_return_segments_when_slot_dropped() {
        let pool = BufferPool::new(4, 4);
        {
            let mut slot = ContentSlot::new(pool.clone(), 64);
            slot.write(Some(b"0123456789")).unwrap();
            assert_eq!(pool.in_use(), 3);
        }
        assert_eq!(pool.in_use(), 0);
    }

    #[tokio::test]
    async fn test_should_buffer_http_body() {
        let mut slot = slot(4, 8, 64);
        slot.write(Some(b"old")).unwrap();
        slot.buffer_body(Full::new(Bytes::from_static(b"{\"a\":1}")))
            .await
            .unwrap();
        assert_eq!(slot.read().unwrap(), "{\"a\":1}");
        assert_eq!(slot.pool().in_use(), 2);
    }

    #[tokio::test]
    async fn test_should_reject_oversized_http_body() {
        let mut slot = slot(4, 8, 4);
        let err = slot
            .buffer_body(Full::new(Bytes::from_static(b"too long")))
            .await
            .unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::ContentTooLarge);
        assert_eq!(slot.pool().in_use(), 0);
    }
}
