use std::io;

use axum::body::{Body, Bytes};
use tokio::sync::mpsc;

/// Chunks buffered for a client that reads slower than they are written.
pub const MAX_PENDING_CHUNKS: usize = 4096;

/// Write end of a streaming response body.
///
/// Bytes are forwarded to the client as soon as they are written. At most
/// [`MAX_PENDING_CHUNKS`] unread chunks are kept, writes past that are
/// dropped. The body finishes once every clone of the sink is dropped.
#[derive(Clone, Debug)]
pub struct BodySink {
    tx: mpsc::Sender<Result<Bytes, io::Error>>,
}

impl BodySink {
    /// Returns false when the chunk was dropped, either because the client
    /// has gone away or because too much is still unread.
    pub fn write(&self, data: impl Into<Bytes>) -> bool {
        // no logging here, the trace recorder writes from inside a subscriber
        self.tx.try_send(Ok(data.into())).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub fn body_channel() -> (BodySink, Body) {
    body_channel_with_capacity(MAX_PENDING_CHUNKS)
}

fn body_channel_with_capacity(capacity: usize) -> (BodySink, Body) {
    let (tx, rx) = mpsc::channel(capacity);
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    (BodySink { tx }, Body::from_stream(stream))
}
