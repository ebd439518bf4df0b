//! Device session
//!
//! A [`KinectSession`] owns the three sub-devices, the motor and command
//! components, and the depth stream thread. Opening runs the bring-up
//! sequence:
//!
//! 1. Probe the motor and home it to the configured angle
//! 2. Initialize the depth registers
//! 3. Open the depth bulk endpoint and start the stream thread
//!
//! Steps 2 and 3 swap when `init_before_stream` is off. Any failure tears
//! down whatever was started, so a failed open leaves nothing claimed.
//!
//! Control operations take `&mut self`, which keeps commands to a
//! sub-device strictly sequential.

use crate::command::CommandTransport;
use crate::config::{DepthSettings, KinectConfig};
use crate::depth_init::initialize_depth;
use crate::error::{KinectError, Result};
use crate::motor::{LedColor, MotorController, MotorStatusSample};
use crate::stream::{DepthStreamHandle, spawn_depth_stream};
use crate::usb::{DeviceManager, UsbDevice};
use common::{DepthFrameSignal, FrameReceiver, FrameSender, SubDevice, create_frame_queue};
use protocol::{DEPTH_ALT_SETTING, DEPTH_ENDPOINT, ParameterRequest};
use tracing::{debug, error, info};

/// The three opened sub-devices of one peripheral
pub struct SubDevices<D> {
    pub camera: D,
    pub audio: D,
    pub motor: D,
}

/// An open peripheral
pub struct KinectSession<D: SubDevice> {
    camera: D,
    audio: D,
    motor: D,
    commands: CommandTransport,
    motor_control: MotorController,
    depth: DepthSettings,
    stream: Option<DepthStreamHandle>,
    frames: FrameReceiver,
    closed: bool,
}

impl KinectSession<UsbDevice> {
    /// Discover the peripheral over USB and bring it up
    pub fn open(config: &KinectConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| KinectError::Config(e.to_string()))?;

        let manager = DeviceManager::new(config)?;
        let devices = manager.discover()?;
        Self::bind(devices, config)
    }
}

impl<D: SubDevice> KinectSession<D> {
    /// Bring up already-opened sub-devices
    ///
    /// On failure every sub-device is closed before the error is returned.
    pub fn bind(devices: SubDevices<D>, config: &KinectConfig) -> Result<Self> {
        let (frame_tx, frames) = create_frame_queue(config.depth.queue_capacity);

        let mut session = Self {
            camera: devices.camera,
            audio: devices.audio,
            motor: devices.motor,
            commands: CommandTransport::new(&config.camera),
            motor_control: MotorController::new(&config.motor),
            depth: config.depth.clone(),
            stream: None,
            frames,
            closed: false,
        };

        match session.start(
            frame_tx,
            config.session.home_angle,
            config.session.init_before_stream,
        ) {
            Ok(()) => {
                info!("Session open");
                Ok(session)
            }
            Err(e) => {
                error!("Failed to open session: {}", e);
                session.close();
                Err(e)
            }
        }
    }

    fn start(&mut self, frames: FrameSender, home_angle: i16, init_first: bool) -> Result<()> {
        self.motor_control.probe(&self.motor)?;
        self.motor_control.set_angle(&self.motor, home_angle)?;

        if init_first {
            initialize_depth(&self.commands, &self.camera)?;
            self.start_stream(frames)?;
        } else {
            self.start_stream(frames)?;
            initialize_depth(&self.commands, &self.camera)?;
        }

        Ok(())
    }

    fn start_stream(&mut self, frames: FrameSender) -> Result<()> {
        let endpoint =
            self.camera
                .open_endpoint(self.depth.interface, DEPTH_ALT_SETTING, DEPTH_ENDPOINT)?;
        self.stream = Some(spawn_depth_stream(
            endpoint,
            DEPTH_ENDPOINT,
            &self.depth,
            frames,
        )?);
        debug!("Depth stream running on {:#04x}", DEPTH_ENDPOINT);
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(KinectError::SessionClosed);
        }
        Ok(())
    }

    /// Tilt the motor to `angle` degrees and wait for it to settle
    pub fn set_angle(&mut self, angle: i16) -> Result<()> {
        self.ensure_open()?;
        self.motor_control.set_angle(&self.motor, angle)
    }

    /// Set the LED color
    pub fn set_led(&mut self, color: LedColor) -> Result<()> {
        self.ensure_open()?;
        self.motor_control.set_led(&self.motor, color)
    }

    /// Read one motor status sample
    pub fn motor_status(&mut self) -> Result<MotorStatusSample> {
        self.ensure_open()?;
        self.motor_control.status(&self.motor)
    }

    /// Read a camera register
    pub fn read_parameter(&mut self, id: u16) -> Result<Vec<u16>> {
        self.ensure_open()?;
        let response = self
            .commands
            .request(&self.camera, ParameterRequest::Read { id })?;
        Ok(response.values)
    }

    /// Block until the stream thread signals the next depth frame
    ///
    /// Fails with [`KinectError::StreamClosed`] once the stream has stopped
    /// and every queued signal was consumed.
    pub fn wait_for_depth_frame(&self) -> Result<DepthFrameSignal> {
        self.ensure_open()?;
        self.frames
            .recv_blocking()
            .map_err(|_| KinectError::StreamClosed)
    }

    /// Wait for the next depth frame from async code
    pub async fn next_depth_frame(&self) -> Result<DepthFrameSignal> {
        self.ensure_open()?;
        self.frames.recv().await.map_err(|_| KinectError::StreamClosed)
    }

    /// Receiver for consuming frame signals from another thread or task
    pub fn frames(&self) -> FrameReceiver {
        self.frames.clone()
    }

    /// Whether [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop the stream and release every sub-device
    ///
    /// The stream thread has exited before any device is closed. Devices
    /// close in the order motor, audio, camera. Calling it again does
    /// nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }

        self.motor.close();
        self.audio.close();
        self.camera.close();

        info!("Session closed");
    }
}

impl<D: SubDevice> Drop for KinectSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SubDeviceKind;
    use common::test_utils::{MockDevice, MockEndpoint, MockReply, camera_reply, motor_sample};
    use protocol::{MOTOR_READY, MOTOR_REQUEST_INIT, MOTOR_REQUEST_STATUS};

    fn fast_config() -> KinectConfig {
        let mut config = KinectConfig::default();
        config.camera.command_poll_interval_ms = 0;
        config.motor.poll_interval_ms = 0;
        config.depth.frame_interval_ms = 1;
        config.depth.buffer_size = 64;
        config
    }

    fn devices() -> (MockDevice, MockDevice, MockDevice) {
        let camera = MockDevice::new(SubDeviceKind::Camera);
        camera.set_default_read(0xC0, 0, MockReply::Data(camera_reply(&[0])));
        camera.set_endpoint(MockEndpoint::new());

        let motor = MockDevice::new(SubDeviceKind::Motor);
        motor.set_default_read(0xC0, MOTOR_REQUEST_INIT, MockReply::Data(vec![MOTOR_READY]));
        motor.set_default_read(
            0xC0,
            MOTOR_REQUEST_STATUS,
            MockReply::Data(motor_sample(0, 0, 0)),
        );

        (camera, MockDevice::new(SubDeviceKind::Audio), motor)
    }

    fn bind(
        camera: &MockDevice,
        audio: &MockDevice,
        motor: &MockDevice,
    ) -> Result<KinectSession<MockDevice>> {
        KinectSession::bind(
            SubDevices {
                camera: camera.clone(),
                audio: audio.clone(),
                motor: motor.clone(),
            },
            &fast_config(),
        )
    }

    #[test]
    fn test_operations_after_close_fail() {
        let (camera, audio, motor) = devices();
        let mut session = bind(&camera, &audio, &motor).unwrap();

        session.close();
        assert!(session.is_closed());
        assert!(matches!(
            session.set_angle(0),
            Err(KinectError::SessionClosed)
        ));
        assert!(matches!(
            session.read_parameter(0x06),
            Err(KinectError::SessionClosed)
        ));
        assert!(matches!(
            session.wait_for_depth_frame(),
            Err(KinectError::SessionClosed)
        ));
    }

    #[test]
    fn test_read_parameter_returns_values() {
        let (camera, audio, motor) = devices();
        let mut session = bind(&camera, &audio, &motor).unwrap();

        camera.queue_read(0xC0, 0, MockReply::Data(camera_reply(&[0x1e, 0x02])));
        assert_eq!(session.read_parameter(0x14).unwrap(), vec![0x1e, 0x02]);
    }

    #[test]
    fn test_motor_status_through_session() {
        let (camera, audio, motor) = devices();
        let mut session = bind(&camera, &audio, &motor).unwrap();

        motor.queue_read(
            0xC0,
            MOTOR_REQUEST_STATUS,
            MockReply::Data(motor_sample(0x10, 0x04, 0x80)),
        );
        let sample = session.motor_status().unwrap();
        assert_eq!(sample.strain(), 0x10);
        assert_eq!(sample.status(), 0x80);
    }
}
