//! USB transfer execution
//!
//! Synchronous control and bulk transfers on rusb handles, with rusb errors
//! mapped to protocol errors.

use protocol::UsbError;
use rusb::{Context, DeviceHandle};
use std::time::Duration;
use tracing::{debug, trace};

/// Default timeout for control transfers (5 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Execute a device-to-host control transfer
pub fn read_control(
    handle: &DeviceHandle<Context>,
    request_type: u8,
    request: u8,
    value: u16,
    index: u16,
    buf: &mut [u8],
) -> Result<usize, UsbError> {
    trace!(
        "Control IN: request_type={:#x}, request={:#x}, value={:#x}, index={:#x}, len={}",
        request_type,
        request,
        value,
        index,
        buf.len()
    );

    handle
        .read_control(request_type, request, value, index, buf, DEFAULT_TIMEOUT)
        .map_err(map_rusb_error)
}

/// Execute a host-to-device control transfer
pub fn write_control(
    handle: &DeviceHandle<Context>,
    request_type: u8,
    request: u8,
    value: u16,
    index: u16,
    data: &[u8],
) -> Result<usize, UsbError> {
    trace!(
        "Control OUT: request_type={:#x}, request={:#x}, value={:#x}, index={:#x}, len={}",
        request_type,
        request,
        value,
        index,
        data.len()
    );

    handle
        .write_control(request_type, request, value, index, data, DEFAULT_TIMEOUT)
        .map_err(map_rusb_error)
}

/// Execute a bulk IN transfer
pub fn read_bulk(
    handle: &DeviceHandle<Context>,
    endpoint: u8,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<usize, UsbError> {
    match handle.read_bulk(endpoint, buf, timeout) {
        Ok(len) => {
            trace!("Bulk IN on {:#x}: {} bytes", endpoint, len);
            Ok(len)
        }
        Err(e) => {
            debug!("Bulk IN on {:#x} failed: {}", endpoint, e);
            Err(map_rusb_error(e))
        }
    }
}

/// Map rusb::Error to protocol::UsbError
pub fn map_rusb_error(err: rusb::Error) -> UsbError {
    match err {
        rusb::Error::Timeout => UsbError::Timeout,
        rusb::Error::Pipe => UsbError::Pipe,
        rusb::Error::NoDevice => UsbError::NoDevice,
        rusb::Error::NotFound => UsbError::NotFound,
        rusb::Error::Busy => UsbError::Busy,
        rusb::Error::Overflow => UsbError::Overflow,
        rusb::Error::Io => UsbError::Io,
        rusb::Error::InvalidParam => UsbError::InvalidParam,
        rusb::Error::Access => UsbError::Access,
        _ => UsbError::Other {
            message: err.to_string(),
        },
    }
}
