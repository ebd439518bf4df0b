//! Tilt motor control
//!
//! The motor sub-device takes its commands directly as control transfer
//! parameters (no framed payload). Tilting is a small state machine:
//! validate the target, light the LED yellow, command the target, then poll
//! status samples until the motor settles, trips the strain cutout, or the
//! polling budget runs out. The LED goes back to green on every exit path.

use crate::config::MotorSettings;
use crate::error::{KinectError, Result};
use common::ControlTransport;
use protocol::{
    MOTOR_READY, MOTOR_REQUEST_INIT, MOTOR_REQUEST_LED, MOTOR_REQUEST_SET_ANGLE,
    MOTOR_REQUEST_STATUS, REQUEST_TYPE_IN, REQUEST_TYPE_OUT,
};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Tilt limit in degrees, either direction
pub const MAX_ANGLE: i16 = 90;

/// Size of a motor status sample
pub const MOTOR_STATUS_LEN: usize = 10;

/// `moving` byte value while the motor is still travelling
pub const MOVING: u8 = 0x80;

/// LED colors understood by the motor firmware
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Off = 0,
    Green = 1,
    Red = 2,
    Yellow = 3,
    BlinkGreen = 4,
    BlinkRedYellow = 6,
}

/// One status sample read from the motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorStatusSample {
    pub raw: [u8; MOTOR_STATUS_LEN],
}

impl MotorStatusSample {
    /// Load indicator, compared against the strain limit
    pub fn strain(&self) -> u8 {
        self.raw[1]
    }

    /// [`MOVING`] while travelling
    pub fn moving(&self) -> u8 {
        self.raw[8]
    }

    /// Zero once the firmware has finished the command
    pub fn status(&self) -> u8 {
        self.raw[9]
    }

    pub fn is_settled(&self) -> bool {
        self.status() == 0 && self.moving() != MOVING
    }
}

/// Convert degrees to the firmware's angle unit (degrees * 128 / 90)
///
/// Division truncates toward zero and negative results are sent as their
/// two's complement bit pattern.
pub fn native_angle(angle: i16) -> u16 {
    (i32::from(angle) * 128 / 90) as i16 as u16
}

/// Drives the tilt motor
///
/// Holds no handle of its own; callers pass the motor for each operation and
/// must serialize operations on the same motor.
#[derive(Debug, Clone)]
pub struct MotorController {
    poll_interval: Duration,
    max_polls: u32,
    strain_limit: u8,
    timeout_is_error: bool,
}

impl MotorController {
    pub fn new(settings: &MotorSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            max_polls: settings.max_polls,
            strain_limit: settings.strain_limit,
            timeout_is_error: settings.timeout_is_error,
        }
    }

    /// Check the motor reports itself ready
    pub fn probe<M: ControlTransport + ?Sized>(&self, motor: &M) -> Result<()> {
        let mut resp = [0xFFu8; 1];
        motor.read_control(REQUEST_TYPE_IN, MOTOR_REQUEST_INIT, 0, 0, &mut resp)?;

        if resp[0] != MOTOR_READY {
            return Err(KinectError::MotorInitFailed(resp[0]));
        }

        debug!("Motor ready");
        Ok(())
    }

    /// Set the LED color
    pub fn set_led<M: ControlTransport + ?Sized>(&self, motor: &M, color: LedColor) -> Result<()> {
        motor.write_control(REQUEST_TYPE_OUT, MOTOR_REQUEST_LED, color as u16, 0, &[])?;
        Ok(())
    }

    /// Read one status sample
    pub fn status<M: ControlTransport + ?Sized>(&self, motor: &M) -> Result<MotorStatusSample> {
        let mut raw = [0u8; MOTOR_STATUS_LEN];
        let n = motor.read_control(REQUEST_TYPE_IN, MOTOR_REQUEST_STATUS, 0, 0, &mut raw)?;
        if n != MOTOR_STATUS_LEN {
            return Err(KinectError::MotorShortRead(n));
        }
        Ok(MotorStatusSample { raw })
    }

    /// Tilt to `angle` degrees and wait for the motor to settle
    ///
    /// Fails with [`KinectError::AngleOutOfRange`] before any transfer when
    /// the angle is outside +/-90. When a status sample reports strain above
    /// the limit, the motor is told to stop before
    /// [`KinectError::MotorStrainExceeded`] is returned.
    pub fn set_angle<M: ControlTransport + ?Sized>(&self, motor: &M, angle: i16) -> Result<()> {
        if !(-MAX_ANGLE..=MAX_ANGLE).contains(&angle) {
            return Err(KinectError::AngleOutOfRange(angle));
        }

        if let Err(e) = self.set_led(motor, LedColor::Yellow) {
            debug!("Failed to set busy LED: {}", e);
        }
        let _led = LedGuard {
            motor,
            color: LedColor::Green,
        };

        let native = native_angle(angle);
        debug!("Tilting to {:+} ({:#06x})", angle, native);
        motor
            .write_control(REQUEST_TYPE_OUT, MOTOR_REQUEST_SET_ANGLE, native, 0, &[])
            .map_err(KinectError::MotorCommandFailed)?;

        for poll in 0..self.max_polls {
            std::thread::sleep(self.poll_interval);

            let sample = self.status(motor)?;
            trace!(
                "Motor sample {}: strain={:#x} moving={:#x} status={:#x}",
                poll,
                sample.strain(),
                sample.moving(),
                sample.status()
            );

            if sample.strain() > self.strain_limit {
                self.stop(motor);
                error!(
                    "Motor strain {:#x} exceeded limit {:#x} turning to {:+}",
                    sample.strain(),
                    self.strain_limit,
                    angle
                );
                return Err(KinectError::MotorStrainExceeded(angle));
            }

            if sample.is_settled() {
                info!("Motor settled at {:+} after {} samples", angle, poll + 1);
                return Ok(());
            }
        }

        if self.timeout_is_error {
            Err(KinectError::MotorTimeout(angle))
        } else {
            warn!(
                "Motor did not settle turning to {:+} after {} samples",
                angle, self.max_polls
            );
            Ok(())
        }
    }

    fn stop<M: ControlTransport + ?Sized>(&self, motor: &M) {
        if let Err(e) = motor.write_control(REQUEST_TYPE_OUT, MOTOR_REQUEST_SET_ANGLE, 0, 0, &[]) {
            error!("Failed to stop motor: {}", e);
        }
    }
}

/// Restores the LED color when dropped
struct LedGuard<'a, M: ControlTransport + ?Sized> {
    motor: &'a M,
    color: LedColor,
}

impl<M: ControlTransport + ?Sized> Drop for LedGuard<'_, M> {
    fn drop(&mut self) {
        if let Err(e) =
            self.motor
                .write_control(REQUEST_TYPE_OUT, MOTOR_REQUEST_LED, self.color as u16, 0, &[])
        {
            debug!("Failed to restore LED: {}", e);
        }
    }
}
