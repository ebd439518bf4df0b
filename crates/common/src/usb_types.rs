//! USB type abstractions
//!
//! The driver never talks to libusb directly. It consumes the three
//! sub-devices through these traits, which the `kinect` crate implements on
//! top of rusb and [`crate::test_utils`] implements with scripted replies.

use protocol::{AUDIO_PRODUCT_ID, CAMERA_PRODUCT_ID, MOTOR_PRODUCT_ID, UsbError};
use std::fmt;

/// The three USB devices the peripheral exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubDeviceKind {
    /// Depth/RGB camera, control commands and the depth bulk endpoint
    Camera,
    /// Microphone array
    Audio,
    /// Tilt motor, LED and status sensor
    Motor,
}

impl SubDeviceKind {
    /// All sub-devices, in discovery order
    pub const ALL: [SubDeviceKind; 3] = [Self::Camera, Self::Audio, Self::Motor];

    /// USB product id of this sub-device
    pub fn product_id(&self) -> u16 {
        match self {
            Self::Camera => CAMERA_PRODUCT_ID,
            Self::Audio => AUDIO_PRODUCT_ID,
            Self::Motor => MOTOR_PRODUCT_ID,
        }
    }

    /// Map a product id back to its sub-device
    pub fn from_product_id(product_id: u16) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.product_id() == product_id)
    }
}

impl fmt::Display for SubDeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Camera => "camera",
            Self::Audio => "audio",
            Self::Motor => "motor",
        };
        f.write_str(name)
    }
}

/// Synchronous control transfers on endpoint 0
pub trait ControlTransport {
    /// Device-to-host control transfer, returns the number of bytes received
    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize, UsbError>;

    /// Host-to-device control transfer, returns the number of bytes sent
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, UsbError>;
}

/// Blocking bulk reads, owned by the depth stream thread
pub trait BulkTransport: Send + 'static {
    fn read_bulk(&self, endpoint: u8, buf: &mut [u8]) -> Result<usize, UsbError>;
}

/// An opened sub-device
pub trait SubDevice: ControlTransport {
    /// Bulk endpoint type handed to the stream thread
    type Endpoint: BulkTransport;

    /// Which sub-device this is
    fn kind(&self) -> SubDeviceKind;

    /// Claim `interface` and select `alt_setting` for bulk reads on `endpoint`
    fn open_endpoint(
        &mut self,
        interface: u8,
        alt_setting: u8,
        endpoint: u8,
    ) -> Result<Self::Endpoint, UsbError>;

    /// Release the device; calling it again does nothing
    fn close(&mut self);
}
