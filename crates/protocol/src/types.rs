//! USB and vendor protocol type definitions
//!
//! This module defines the transfer-level error type shared by every crate,
//! the control transfer four-tuples the device understands, and the USB
//! identifiers of the three sub-devices.

use thiserror::Error;

/// Microsoft Corp. vendor id shared by all three sub-devices
pub const VENDOR_ID: u16 = 0x045e;

/// XBOX NUI Camera
pub const CAMERA_PRODUCT_ID: u16 = 0x02ae;

/// XBOX NUI Audio
pub const AUDIO_PRODUCT_ID: u16 = 0x02ad;

/// XBOX NUI Motor
pub const MOTOR_PRODUCT_ID: u16 = 0x02b0;

/// Interface carrying the depth bulk endpoint
pub const DEPTH_INTERFACE: u8 = 1;

/// Alternate setting of the depth interface
pub const DEPTH_ALT_SETTING: u8 = 0;

/// Depth bulk IN endpoint address
pub const DEPTH_ENDPOINT: u8 = 0x82;

/// Vendor request type, host to device
pub const REQUEST_TYPE_OUT: u8 = 0x40;

/// Vendor request type, device to host
pub const REQUEST_TYPE_IN: u8 = 0xC0;

/// Motor readiness probe (IN, one status byte)
pub const MOTOR_REQUEST_INIT: u8 = 0x10;

/// Motor LED color (OUT, color in wValue)
pub const MOTOR_REQUEST_LED: u8 = 0x06;

/// Motor tilt target (OUT, native angle in wValue)
pub const MOTOR_REQUEST_SET_ANGLE: u8 = 0x31;

/// Motor status sample (IN, 10 bytes)
pub const MOTOR_REQUEST_STATUS: u8 = 0x32;

/// Camera command write and response read both use request number 0
pub const CAMERA_REQUEST_COMMAND: u8 = 0x00;

/// Status byte returned by the motor readiness probe when it is ready
pub const MOTOR_READY: u8 = 0x22;

/// Control command codes carried in the control header
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Read a camera parameter
    ReadParameter = 2,
    /// Write a camera parameter
    SetParameter = 3,
}

impl ControlCommand {
    /// Decode a raw command code, `None` for codes the host never sends
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            2 => Some(Self::ReadParameter),
            3 => Some(Self::SetParameter),
            _ => None,
        }
    }
}

/// USB error types
///
/// Maps to libusb error codes. See rusb::Error for details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsbError {
    /// Transfer timed out
    #[error("transfer timed out")]
    Timeout,
    /// Endpoint stalled (protocol error)
    #[error("endpoint stalled")]
    Pipe,
    /// Device was disconnected
    #[error("device disconnected")]
    NoDevice,
    /// Device or endpoint not found
    #[error("device or endpoint not found")]
    NotFound,
    /// Device is busy
    #[error("device busy")]
    Busy,
    /// Buffer overflow
    #[error("buffer overflow")]
    Overflow,
    /// I/O error
    #[error("I/O error")]
    Io,
    /// Invalid parameter
    #[error("invalid parameter")]
    InvalidParam,
    /// Access denied (permissions)
    #[error("access denied")]
    Access,
    /// Other error with message
    #[error("{message}")]
    Other { message: String },
}
