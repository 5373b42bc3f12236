//! MJPEG stream over a pipeline's shared state.
//!
//! Each client gets its own lazy stream of multipart chunks. A chunk is
//! produced only when the transport asks for the next one, so a slow client
//! slows only itself, and dropping the stream ends the work for that client.
//! Streams also end when the process-wide shutdown flag is raised, which
//! lets the server drain connections that would otherwise never finish.

use std::sync::Arc;

use futures::stream::{self, Stream};
use metrics::gauge;
use tokio::sync::watch;
use tracing::{debug, warn};
use vmon_media::{Codec, Frame, MediaResult, Overlay, PLACEHOLDER_CAPTION};

use crate::shared_state::SharedState;
use crate::telemetry;

/// Multipart boundary token separating frames.
pub const MJPEG_BOUNDARY: &str = "frame";

/// Response content type for an MJPEG stream.
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

pub const PLACEHOLDER_WIDTH: u32 = 640;
pub const PLACEHOLDER_HEIGHT: u32 = 480;

/// Encodes the latest frame of a [`SharedState`] into multipart chunks.
pub struct StreamPublisher<M> {
    shared: Arc<SharedState<M>>,
    codec: Arc<dyn Codec>,
    placeholder: Arc<Frame>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<M> Clone for StreamPublisher<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            codec: Arc::clone(&self.codec),
            placeholder: Arc::clone(&self.placeholder),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<M: Clone + Default + Send + Sync + 'static> StreamPublisher<M> {
    pub fn new(shared: Arc<SharedState<M>>, codec: Arc<dyn Codec>, overlay: &Overlay) -> Self {
        let placeholder =
            overlay.placeholder(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, PLACEHOLDER_CAPTION);
        Self {
            shared,
            codec,
            placeholder: Arc::new(placeholder),
            shutdown: None,
        }
    }

    /// End the stream once `shutdown` turns `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn is_shut_down(&self) -> bool {
        self.shutdown.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Encode the current frame, or the placeholder before the first one,
    /// as one multipart chunk.
    pub fn next_chunk(&self) -> MediaResult<Vec<u8>> {
        // The snapshot keeps the frame alive after the lock is released.
        let snapshot = self.shared.snapshot();
        let frame = snapshot.frame.as_deref().unwrap_or(self.placeholder.as_ref());
        let encoded = self.codec.encode(frame)?;
        Ok(wrap_part(self.codec.content_type(), &encoded))
    }

    /// Unbounded chunk stream for one client.
    ///
    /// Encoding runs on the blocking pool. A frame that fails to encode is
    /// skipped and the next snapshot is tried.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send {
        let guard = ClientGuard::new();
        stream::unfold((self, guard), |(publisher, guard)| async move {
            loop {
                if publisher.is_shut_down() {
                    return None;
                }
                let worker = publisher.clone();
                match tokio::task::spawn_blocking(move || worker.next_chunk()).await {
                    Ok(Ok(chunk)) => return Some((Ok(chunk), (publisher, guard))),
                    Ok(Err(e)) => {
                        warn!(error = %e, "Frame encoding failed, skipping");
                        tokio::task::yield_now().await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Encoder task aborted, closing stream");
                        return None;
                    }
                }
            }
        })
    }
}

/// Frame `payload` as one part of a `multipart/x-mixed-replace` body.
pub fn wrap_part(content_type: &str, payload: &[u8]) -> Vec<u8> {
    let header = format!(
        "--{}\r\nContent-Type: {}\r\n\r\n",
        MJPEG_BOUNDARY, content_type
    );
    let mut chunk = Vec::with_capacity(header.len() + payload.len() + 2);
    chunk.extend_from_slice(header.as_bytes());
    chunk.extend_from_slice(payload);
    chunk.extend_from_slice(b"\r\n");
    chunk
}

/// Counts connected stream clients for the lifetime of one stream.
struct ClientGuard;

impl ClientGuard {
    fn new() -> Self {
        gauge!(telemetry::STREAM_CLIENTS_ACTIVE).increment(1.0);
        debug!("Stream client connected");
        Self
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        gauge!(telemetry::STREAM_CLIENTS_ACTIVE).decrement(1.0);
        debug!("Stream client disconnected");
    }
}
