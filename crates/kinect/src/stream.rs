//! Depth stream thread
//!
//! Dedicated thread pulling raw buffers from the depth bulk endpoint at the
//! frame cadence and signalling each non-empty read on the frame-ready queue.
//!
//! The thread owns the endpoint for its whole lifetime. Shutdown is a
//! rendezvous: the owner cancels, then waits for the completion signal the
//! thread fires on exit, so the endpoint is never read after it is released.

use crate::config::DepthSettings;
use crate::error::{KinectError, Result};
use common::{
    BulkTransport, CancelToken, Completion, CompletionGuard, DepthFrameSignal, FrameSender,
    completion_pair,
};
use protocol::UsbError;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Depth stream worker
///
/// Owns the endpoint, the read buffer, and the producer side of the
/// frame-ready queue.
pub struct DepthStreamReader<E: BulkTransport> {
    endpoint: E,
    endpoint_address: u8,
    buffer: Vec<u8>,
    frame_interval: Duration,
    frames: FrameSender,
    cancel: CancelToken,
    sequence: u64,
    /// Dropped when `run` returns, firing the owner's completion signal
    _done: CompletionGuard,
}

impl<E: BulkTransport> DepthStreamReader<E> {
    /// Run the read loop until cancelled
    ///
    /// Each iteration sleeps one frame interval, checks for cancellation,
    /// then performs one blocking bulk read. Read errors and empty reads are
    /// logged and skipped.
    pub fn run(mut self) {
        info!("Depth stream started");

        loop {
            std::thread::sleep(self.frame_interval);

            if self.cancel.is_cancelled() {
                break;
            }

            match self
                .endpoint
                .read_bulk(self.endpoint_address, &mut self.buffer)
            {
                Ok(0) => {
                    debug!("Read empty depth frame");
                }
                Ok(n) => {
                    trace!("Read depth frame {}: {} bytes", self.sequence, n);
                    self.frames.signal(DepthFrameSignal {
                        sequence: self.sequence,
                        len: n,
                    });
                    self.sequence += 1;
                }
                Err(UsbError::Timeout) => {
                    debug!("Depth read timed out");
                }
                Err(e) => {
                    warn!("Depth read error: {}", e);
                }
            }
        }

        info!("Depth stream stopped after {} frames", self.sequence);
    }
}

/// Owner's handle on a running depth stream thread
pub struct DepthStreamHandle {
    cancel: CancelToken,
    completion: Completion,
    thread: Option<JoinHandle<()>>,
}

impl DepthStreamHandle {
    /// Cancel the thread and block until it has exited
    ///
    /// Returns within one loop iteration plus any bulk read already in
    /// flight. Calling it again does nothing.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.cancel.cancel();
        self.completion.wait();

        if thread.join().is_err() {
            error!("Depth stream thread panicked");
        }
        debug!("Depth stream joined");
    }

    /// Whether the thread has exited
    pub fn is_finished(&self) -> bool {
        self.completion.is_complete()
    }
}

impl Drop for DepthStreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the depth stream thread
///
/// The endpoint moves into the thread and is dropped there once the loop
/// exits.
pub fn spawn_depth_stream<E: BulkTransport>(
    endpoint: E,
    endpoint_address: u8,
    settings: &DepthSettings,
    frames: FrameSender,
) -> Result<DepthStreamHandle> {
    let cancel = CancelToken::new();
    let (done, completion) = completion_pair();

    let reader = DepthStreamReader {
        endpoint,
        endpoint_address,
        buffer: vec![0u8; settings.buffer_size],
        frame_interval: settings.frame_interval(),
        frames,
        cancel: cancel.clone(),
        sequence: 0,
        _done: done,
    };

    let thread = std::thread::Builder::new()
        .name("depth-stream".to_string())
        .spawn(move || reader.run())
        .map_err(KinectError::Spawn)?;

    Ok(DepthStreamHandle {
        cancel,
        completion,
        thread: Some(thread),
    })
}
