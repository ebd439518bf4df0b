//! Common utilities for rust-kinect
//!
//! This crate provides shared functionality between the protocol layer and the
//! device driver: the transport traits that stand in for the USB layer, the
//! frame-ready queue and shutdown signals connecting the caller's thread with
//! the depth stream thread, error handling, logging setup, and test doubles.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;
pub mod usb_types;

pub use channel::{
    CancelToken, Completion, CompletionGuard, DepthFrameSignal, FrameReceiver, FrameSender,
    completion_pair, create_frame_queue,
};
pub use error::{Error, Result};
pub use logging::setup_logging;
pub use usb_types::{BulkTransport, ControlTransport, SubDevice, SubDeviceKind};
