//! Driver error types

use common::SubDeviceKind;
use protocol::{ProtocolError, UsbError};
use thiserror::Error;

/// Errors surfaced by the device session and its components
#[derive(Debug, Error)]
pub enum KinectError {
    /// One of the three sub-devices is not attached
    #[error("Failed to detect {0}")]
    DeviceNotFound(SubDeviceKind),

    /// The motor readiness probe returned an unexpected status byte
    #[error("Motor init failed (code {0:#x})")]
    MotorInitFailed(u8),

    /// Requested tilt outside [-90, 90]
    #[error("Motor angle out of range: {0} (must be +/-90)")]
    AngleOutOfRange(i16),

    /// The tilt command itself was rejected by the transport
    #[error("Set motor angle: {0}")]
    MotorCommandFailed(UsbError),

    /// A motor status sample came back shorter than 10 bytes
    #[error("Motor status short read: {0} bytes")]
    MotorShortRead(usize),

    /// Strain cutout tripped; the motor has been told to stop
    #[error("Motor strain threshold exceeded turning to {0:+}")]
    MotorStrainExceeded(i16),

    /// The motor never reported settling within the polling budget
    #[error("Motor did not settle turning to {0:+}")]
    MotorTimeout(i16),

    /// The camera never answered a command within the polling budget
    #[error("Camera command not answered after {tries} polls")]
    CommandTimeout { tries: u32 },

    /// A camera response could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A depth initialization step was not acknowledged
    #[error("Camera init #{index} failed: {got:?}")]
    InitSequenceFailed { index: usize, got: Vec<u16> },

    /// Transport error passed through from the USB layer
    #[error("USB error: {0}")]
    Usb(#[from] UsbError),

    /// The depth stream has stopped and no frames remain
    #[error("Depth stream closed")]
    StreamClosed,

    /// Operation on a session that has already been closed
    #[error("Session closed")]
    SessionClosed,

    /// Stream thread could not be started
    #[error("Failed to spawn depth stream thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KinectError {
    /// Whether the error was raised by the strain safety cutout
    pub fn is_strain_cutout(&self) -> bool {
        matches!(self, Self::MotorStrainExceeded(_))
    }
}

/// Type alias for driver results
pub type Result<T> = std::result::Result<T, KinectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KinectError::MotorStrainExceeded(20);
        assert_eq!(
            format!("{}", err),
            "Motor strain threshold exceeded turning to +20"
        );
        assert!(err.is_strain_cutout());

        let err = KinectError::InitSequenceFailed {
            index: 3,
            got: vec![0, 1],
        };
        assert_eq!(format!("{}", err), "Camera init #3 failed: [0, 1]");

        let err = KinectError::DeviceNotFound(SubDeviceKind::Motor);
        assert_eq!(format!("{}", err), "Failed to detect motor");
    }

    #[test]
    fn test_from_conversions() {
        let err: KinectError = UsbError::Pipe.into();
        assert!(matches!(err, KinectError::Usb(UsbError::Pipe)));

        let err: KinectError = ProtocolError::TruncatedFrame {
            expected: 10,
            actual: 8,
        }
        .into();
        assert!(matches!(err, KinectError::Protocol(_)));
    }
}
