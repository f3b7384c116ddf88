//! Response bodies — fully-materialized buffers and incremental streams.
//!
//! A [`Body`] is either a [`Bytes`] buffer known in full up front, or a
//! [`StreamBody`] whose chunks arrive over time. Streams support passive
//! fan-out: [`StreamBody::observe`] attaches an additional listener that sees
//! every chunk the primary consumer sees, without intercepting or throttling
//! the primary delivery path. This is what lets a caching layer capture a
//! streamed body while the real client keeps receiving it live.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

/// A response body: a complete buffer or an open-ended chunk stream.
#[derive(Debug)]
pub enum Body {
    /// The whole body, materialized.
    Full(Bytes),
    /// An incrementally-emitting stream with an end-of-stream signal.
    Stream(StreamBody),
}

impl Body {
    /// An empty materialized body.
    pub fn empty() -> Self {
        Self::Full(Bytes::new())
    }

    /// Returns the materialized bytes, or `None` for a stream.
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Full(bytes) => Some(bytes),
            Self::Stream(_) => None,
        }
    }

    /// Returns the stream, or `None` for a materialized body.
    pub fn stream(&self) -> Option<&StreamBody> {
        match self {
            Self::Full(_) => None,
            Self::Stream(stream) => Some(stream),
        }
    }

    /// Returns `true` for a stream-typed body.
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Full(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Full(Bytes::from(text.into_bytes()))
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Full(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<StreamBody> for Body {
    fn from(stream: StreamBody) -> Self {
        Self::Stream(stream)
    }
}

// Fan-out state shared by the producer handle, the primary consumer, and any
// observers. Emitted chunks are retained as ref-counted `Bytes` clones so a
// tap attached after the first chunks still replays the complete body.
#[derive(Debug)]
struct Shared {
    taps: Vec<mpsc::UnboundedSender<Bytes>>,
    emitted: Vec<Bytes>,
    finished: bool,
}

/// Producer handle for a [`StreamBody`].
///
/// Every chunk passed to [`send`](Self::send) is fanned out to the primary
/// consumer and all attached observers. Dropping the sender (or calling
/// [`finish`](Self::finish)) signals end-of-stream to all of them.
#[derive(Debug)]
pub struct StreamSender {
    shared: Arc<Mutex<Shared>>,
}

impl StreamSender {
    /// Emits one chunk to every listener. Chunks sent after the stream has
    /// finished are discarded.
    pub fn send(&self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        let mut shared = self.shared.lock().expect("stream body state poisoned");
        if shared.finished {
            return;
        }
        shared.emitted.push(chunk.clone());
        shared.taps.retain(|tap| tap.send(chunk.clone()).is_ok());
    }

    /// Signals end-of-stream. Equivalent to dropping the sender.
    pub fn finish(self) {}
}

impl Drop for StreamSender {
    fn drop(&mut self) {
        let mut shared = self.shared.lock().expect("stream body state poisoned");
        shared.finished = true;
        // Closing the channels is the end-of-stream signal; listeners drain
        // whatever is already queued, then see `None`.
        shared.taps.clear();
    }
}

/// A stream-typed response body.
///
/// The primary consumer reads chunks with [`chunk`](Self::chunk) until it
/// returns `None` (end-of-stream). Additional passive listeners are attached
/// with [`observe`](Self::observe).
///
/// # Examples
///
/// ```
/// use recap::http::StreamBody;
///
/// # async fn demo() {
/// let (sender, mut body) = StreamBody::channel();
/// let mut capture = body.observe();
///
/// sender.send("ab");
/// sender.send("cd");
/// sender.finish();
///
/// let mut delivered = Vec::new();
/// while let Some(chunk) = body.chunk().await {
///     delivered.extend_from_slice(&chunk);
/// }
/// assert_eq!(delivered, b"abcd");
/// assert_eq!(capture.chunk().await.as_deref(), Some(&b"ab"[..]));
/// # }
/// ```
#[derive(Debug)]
pub struct StreamBody {
    rx: mpsc::UnboundedReceiver<Bytes>,
    shared: Arc<Mutex<Shared>>,
}

impl StreamBody {
    /// Creates a connected producer/consumer pair.
    pub fn channel() -> (StreamSender, StreamBody) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Mutex::new(Shared {
            taps: vec![tx],
            emitted: Vec::new(),
            finished: false,
        }));
        (
            StreamSender {
                shared: Arc::clone(&shared),
            },
            StreamBody { rx, shared },
        )
    }

    /// Receives the next chunk, or `None` once the stream has ended.
    pub async fn chunk(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Attaches a passive observer that receives every chunk of this body,
    /// including chunks emitted before the observer was attached (replayed
    /// from the retained emission log).
    ///
    /// Observation never blocks or intercepts the primary consumer: each
    /// listener has its own unbounded queue fed by the same emission source.
    pub fn observe(&self) -> BodyTap {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut shared = self.shared.lock().expect("stream body state poisoned");
        for chunk in &shared.emitted {
            // Replay cannot fail; we still hold the receiver.
            let _ = tx.send(chunk.clone());
        }
        if !shared.finished {
            shared.taps.push(tx);
        }
        BodyTap { rx }
    }
}

/// A passive listener attached to a [`StreamBody`] via
/// [`observe`](StreamBody::observe).
#[derive(Debug)]
pub struct BodyTap {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl BodyTap {
    /// Receives the next observed chunk, or `None` once the stream has ended.
    pub async fn chunk(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain_tap(mut tap: BodyTap) -> Vec<u8> {
        let mut collected = Vec::new();
        while let Some(chunk) = tap.chunk().await {
            collected.extend_from_slice(&chunk);
        }
        collected
    }

    #[tokio::test]
    async fn primary_and_observer_both_receive_all_chunks() {
        let (sender, mut body) = StreamBody::channel();
        let tap = body.observe();

        sender.send("ab");
        sender.send("cd");
        sender.finish();

        let mut delivered = Vec::new();
        while let Some(chunk) = body.chunk().await {
            delivered.extend_from_slice(&chunk);
        }
        assert_eq!(delivered, b"abcd");
        assert_eq!(drain_tap(tap).await, b"abcd");
    }

    #[tokio::test]
    async fn late_observer_replays_earlier_chunks() {
        let (sender, body) = StreamBody::channel();
        sender.send("early");
        let tap = body.observe();
        sender.send(" late");
        sender.finish();

        assert_eq!(drain_tap(tap).await, b"early late");
    }

    #[tokio::test]
    async fn observer_after_finish_sees_full_body_then_end() {
        let (sender, body) = StreamBody::channel();
        sender.send("done");
        sender.finish();

        assert_eq!(drain_tap(body.observe()).await, b"done");
    }

    #[tokio::test]
    async fn dropped_sender_ends_an_empty_stream() {
        let (sender, mut body) = StreamBody::channel();
        drop(sender);
        assert!(body.chunk().await.is_none());
    }

    #[tokio::test]
    async fn slow_observer_does_not_block_primary() {
        let (sender, mut body) = StreamBody::channel();
        let tap = body.observe(); // never read until the end

        for _ in 0..100 {
            sender.send("x");
        }
        sender.finish();

        let mut delivered = 0usize;
        while let Some(chunk) = body.chunk().await {
            delivered += chunk.len();
        }
        assert_eq!(delivered, 100);
        assert_eq!(drain_tap(tap).await.len(), 100);
    }
}
