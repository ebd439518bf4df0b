//! Protocol library for rust-kinect
//!
//! This crate defines the vendor control protocol spoken by the camera
//! sub-device: request encoding, response decoding with length validation,
//! and the constants (USB ids, control transfer four-tuples, depth endpoint)
//! shared by the rest of the workspace.
//!
//! # Example
//!
//! ```
//! use protocol::{ControlCommand, decode_response, encode_set_parameter};
//!
//! // Build a "set parameter" request
//! let request = encode_set_parameter(0x06, 0x02);
//! let echoed = decode_response(&request).unwrap();
//! assert_eq!(echoed.header.magic, *b"GM");
//! assert_eq!(echoed.header.command_kind(), Some(ControlCommand::SetParameter));
//! assert_eq!(echoed.values, vec![0x06, 0x02]);
//! ```

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{
    COMMAND_MAGIC, CameraFrameHeader, ControlHeader, FRAME_MAGIC, ParameterRequest,
    ParameterResponse, decode_response, encode_read_parameter, encode_set_parameter,
};
pub use error::{ProtocolError, Result};
pub use types::{
    AUDIO_PRODUCT_ID, CAMERA_PRODUCT_ID, CAMERA_REQUEST_COMMAND, ControlCommand, DEPTH_ALT_SETTING,
    DEPTH_ENDPOINT, DEPTH_INTERFACE, MOTOR_PRODUCT_ID, MOTOR_READY, MOTOR_REQUEST_INIT,
    MOTOR_REQUEST_LED, MOTOR_REQUEST_SET_ANGLE, MOTOR_REQUEST_STATUS, REQUEST_TYPE_IN,
    REQUEST_TYPE_OUT, UsbError, VENDOR_ID,
};
