//! Camera command transport
//!
//! Commands are written to the camera with one vendor control transfer. The
//! firmware acknowledges asynchronously and there is no interrupt to wait on,
//! so the response is polled with a second control transfer until it returns
//! data or the poll budget runs out.

use crate::config::CameraSettings;
use crate::error::{KinectError, Result};
use common::ControlTransport;
use protocol::{
    CAMERA_REQUEST_COMMAND, ParameterRequest, ParameterResponse, REQUEST_TYPE_IN,
    REQUEST_TYPE_OUT, decode_response,
};
use std::time::Duration;
use tracing::{debug, trace};

/// Sends commands to the camera and collects its responses
///
/// Holds no handle of its own; callers pass the camera for each command and
/// must not issue commands to the same camera concurrently.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    poll_interval: Duration,
    max_tries: u32,
    response_capacity: usize,
}

impl CommandTransport {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            max_tries: settings.command_max_tries,
            response_capacity: settings.response_capacity,
        }
    }

    /// Send a raw command and wait for the raw response
    ///
    /// Transport errors on either transfer are returned immediately. A camera
    /// that stays silent for the whole poll budget yields
    /// [`KinectError::CommandTimeout`].
    pub fn send<C: ControlTransport + ?Sized>(&self, camera: &C, send: &[u8]) -> Result<Vec<u8>> {
        debug!("Command: {:02x?}", send);
        camera.write_control(REQUEST_TYPE_OUT, CAMERA_REQUEST_COMMAND, 0, 0, send)?;

        let mut recv = vec![0u8; self.response_capacity];
        for attempt in 1..=self.max_tries {
            std::thread::sleep(self.poll_interval);

            let n = camera.read_control(REQUEST_TYPE_IN, CAMERA_REQUEST_COMMAND, 0, 0, &mut recv)?;
            if n > 0 {
                debug!("Command accepted after {} tries ({:02x?})", attempt, send);
                recv.truncate(n);
                return Ok(recv);
            }
            trace!("No response yet (try {})", attempt);
        }

        Err(KinectError::CommandTimeout {
            tries: self.max_tries,
        })
    }

    /// Send a parameter request and decode the response
    pub fn request<C: ControlTransport + ?Sized>(
        &self,
        camera: &C,
        request: ParameterRequest,
    ) -> Result<ParameterResponse> {
        let raw = self.send(camera, &request.encode())?;
        let response = decode_response(&raw)?;
        debug!(
            "Command {:?} returned {:?} {:?}",
            request, response.header, response.values
        );
        Ok(response)
    }
}
