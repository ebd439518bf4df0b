//! Depth register initialization
//!
//! A fixed, ordered list of "set parameter" commands puts the camera into
//! depth streaming mode. Each step depends on the register state left by the
//! previous one, so the list runs strictly in order and stops at the first
//! step the firmware does not acknowledge.

use crate::command::CommandTransport;
use crate::error::{KinectError, Result};
use common::ControlTransport;
use protocol::ParameterRequest;
use tracing::{debug, info};

/// `(parameter id, value)` pairs written during initialization
pub const DEPTH_INIT_SEQUENCE: [(u16, u16); 7] = [
    (0x105, 0x00),
    // Stop streaming before reconfiguring
    (0x06, 0x00),
    // Depth format, register depends on firmware revision
    (0x12, 0x02),
    (0x13, 0x01),
    (0x14, 0x1e),
    // Start depth streaming
    (0x06, 0x02),
    (0x17, 0x00),
];

/// Run [`DEPTH_INIT_SEQUENCE`] against the camera
///
/// Every step must be answered with exactly one value equal to zero;
/// anything else fails with [`KinectError::InitSequenceFailed`] naming the
/// step, and no further steps are sent.
pub fn initialize_depth<C: ControlTransport + ?Sized>(
    transport: &CommandTransport,
    camera: &C,
) -> Result<()> {
    for (index, &(id, value)) in DEPTH_INIT_SEQUENCE.iter().enumerate() {
        let response = transport.request(camera, ParameterRequest::Set { id, value })?;
        if !response.is_ack() {
            return Err(KinectError::InitSequenceFailed {
                index,
                got: response.values,
            });
        }
        debug!("Depth init #{} ({:#x} <- {:#x}) acknowledged", index, id, value);
    }

    info!("Depth registers initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraSettings;
    use common::SubDeviceKind;
    use common::test_utils::{MockDevice, MockReply, camera_reply};
    use protocol::decode_response;

    fn transport() -> CommandTransport {
        CommandTransport::new(&CameraSettings {
            command_poll_interval_ms: 0,
            command_max_tries: 5,
            response_capacity: 200,
        })
    }

    fn sent_parameters(camera: &MockDevice) -> Vec<(u16, u16)> {
        camera
            .calls_for(0x40, 0)
            .iter()
            .map(|call| {
                let values = decode_response(&call.data).unwrap().values;
                (values[0], values[1])
            })
            .collect()
    }

    #[test]
    fn test_full_sequence_in_order() {
        let camera = MockDevice::new(SubDeviceKind::Camera);
        camera.set_default_read(0xC0, 0, MockReply::Data(camera_reply(&[0])));

        initialize_depth(&transport(), &camera).unwrap();
        assert_eq!(sent_parameters(&camera), DEPTH_INIT_SEQUENCE.to_vec());
    }

    #[test]
    fn test_nonzero_ack_names_step() {
        let camera = MockDevice::new(SubDeviceKind::Camera);
        camera.queue_read(0xC0, 0, MockReply::Data(camera_reply(&[0])));
        camera.queue_read(0xC0, 0, MockReply::Data(camera_reply(&[5])));

        let err = initialize_depth(&transport(), &camera).unwrap_err();
        match err {
            KinectError::InitSequenceFailed { index, got } => {
                assert_eq!(index, 1);
                assert_eq!(got, vec![5]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(sent_parameters(&camera).len(), 2);
    }

    #[test]
    fn test_wrong_value_count_stops_sequence() {
        let camera = MockDevice::new(SubDeviceKind::Camera);
        for _ in 0..3 {
            camera.queue_read(0xC0, 0, MockReply::Data(camera_reply(&[0])));
        }
        camera.queue_read(0xC0, 0, MockReply::Data(camera_reply(&[0, 0])));
        camera.set_default_read(0xC0, 0, MockReply::Data(camera_reply(&[0])));

        let err = initialize_depth(&transport(), &camera).unwrap_err();
        assert!(matches!(
            err,
            KinectError::InitSequenceFailed { index: 3, ref got } if got == &vec![0, 0]
        ));
        assert_eq!(sent_parameters(&camera), DEPTH_INIT_SEQUENCE[..4].to_vec());
    }

    #[test]
    fn test_empty_ack_fails() {
        let camera = MockDevice::new(SubDeviceKind::Camera);
        camera.queue_read(0xC0, 0, MockReply::Data(camera_reply(&[])));

        let err = initialize_depth(&transport(), &camera).unwrap_err();
        assert!(matches!(err, KinectError::InitSequenceFailed { index: 0, .. }));
    }
}
