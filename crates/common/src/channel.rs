//! Channels between the caller's thread and the depth stream thread
//!
//! Three primitives, all built on `async_channel` so they can be consumed from
//! blocking code and from async tasks alike:
//! - a bounded frame-ready queue the stream thread pushes into without blocking
//! - a cancellation token, signalled by closing an empty channel
//! - a completion signal, fired when the stream thread drops its guard

use async_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use tracing::{debug, warn};

/// Notification that a depth buffer was received
///
/// The raw bytes are not forwarded; only their count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthFrameSignal {
    /// Monotonic counter of delivered frames, starting at 0
    pub sequence: u64,
    /// Number of bytes the bulk read returned
    pub len: usize,
}

/// Producer side of the frame-ready queue (stream thread)
pub struct FrameSender {
    tx: Sender<DepthFrameSignal>,
}

impl FrameSender {
    /// Push a signal without blocking
    ///
    /// Returns false when the signal was dropped because the queue is full or
    /// every receiver is gone.
    pub fn signal(&self, frame: DepthFrameSignal) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                warn!(
                    "Frame queue full ({} pending), dropping frame {}",
                    self.tx.len(),
                    frame.sequence
                );
                false
            }
            Err(TrySendError::Closed(frame)) => {
                debug!("Frame queue closed, dropping frame {}", frame.sequence);
                false
            }
        }
    }
}

/// Consumer side of the frame-ready queue
#[derive(Clone)]
pub struct FrameReceiver {
    rx: Receiver<DepthFrameSignal>,
}

impl FrameReceiver {
    /// Wait for the next frame (blocking)
    pub fn recv_blocking(&self) -> crate::Result<DepthFrameSignal> {
        self.rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Wait for the next frame
    pub async fn recv(&self) -> crate::Result<DepthFrameSignal> {
        self.rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Take a pending frame without waiting
    pub fn try_recv(&self) -> Option<DepthFrameSignal> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Number of frames waiting to be consumed
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

/// Create the frame-ready queue
///
/// Returns (FrameSender for the stream thread, FrameReceiver for consumers)
pub fn create_frame_queue(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (FrameSender { tx }, FrameReceiver { rx })
}

/// Cancellation signal shared between the session and its stream thread
#[derive(Clone)]
pub struct CancelToken {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Signal cancellation; later calls are no-ops
    pub fn cancel(&self) {
        if self.tx.close() {
            debug!("Cancellation signalled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.is_closed()
    }

    /// Resolve once cancellation has been signalled
    pub async fn cancelled(&self) {
        // Nothing is ever sent, so this only returns once the channel closes
        let _ = self.rx.recv().await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by a worker for its whole lifetime; dropping it fires the [`Completion`]
pub struct CompletionGuard {
    _tx: Sender<()>,
}

/// Observer side of a worker's completion
pub struct Completion {
    rx: Receiver<()>,
}

impl Completion {
    /// Block until the guard has been dropped
    pub fn wait(&self) {
        // Closed once the only sender (the guard) is dropped
        let _ = self.rx.recv_blocking();
    }

    pub fn is_complete(&self) -> bool {
        self.rx.is_closed()
    }
}

/// Create a completion signal pair
pub fn completion_pair() -> (CompletionGuard, Completion) {
    let (tx, rx) = bounded(1);
    (CompletionGuard { _tx: tx }, Completion { rx })
}
