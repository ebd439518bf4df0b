//! Camera control frame encoding and decoding
//!
//! The camera sub-device accepts vendor commands as control transfer payloads
//! and answers them through a second control transfer. Both directions share
//! one framing.
//!
//! # Frame Format
//!
//! All fields are little-endian:
//! ```text
//! [magic: 2 bytes][words: u16][command: u16][tag: u16][words x u16 values]
//! ```
//!
//! Requests from the host carry the magic `"GM"`. Responses are trusted only
//! as far as their declared word count fits inside the received buffer.

use crate::error::{ProtocolError, Result};
use crate::types::ControlCommand;
use byteorder::{ByteOrder, LittleEndian};

/// Magic tag of host-to-device command frames
pub const COMMAND_MAGIC: [u8; 2] = *b"GM";

/// Magic tag of camera data frame headers
pub const FRAME_MAGIC: [u8; 2] = *b"RB";

/// Fixed 8-byte header preceding every control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlHeader {
    /// `"GM"` for requests
    pub magic: [u8; 2],
    /// Number of 16-bit values following the header
    pub words: u16,
    /// Command code, see [`ControlCommand`]
    pub command: u16,
    /// Opaque tag, echoed by the firmware
    pub tag: u16,
}

impl ControlHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = 8;

    /// Create a request header for the given command
    pub fn request(command: ControlCommand, words: u16) -> Self {
        Self {
            magic: COMMAND_MAGIC,
            words,
            command: command as u16,
            tag: 0,
        }
    }

    /// Serialize the header
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.magic);
        LittleEndian::write_u16(&mut buf[2..4], self.words);
        LittleEndian::write_u16(&mut buf[4..6], self.command);
        LittleEndian::write_u16(&mut buf[6..8], self.tag);
        buf
    }

    /// Parse a header from the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(ProtocolError::TruncatedFrame {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            magic: [bytes[0], bytes[1]],
            words: LittleEndian::read_u16(&bytes[2..4]),
            command: LittleEndian::read_u16(&bytes[4..6]),
            tag: LittleEndian::read_u16(&bytes[6..8]),
        })
    }

    /// Total frame length this header declares
    pub fn frame_len(&self) -> usize {
        Self::SIZE + 2 * self.words as usize
    }

    /// Decoded command code, if known
    pub fn command_kind(&self) -> Option<ControlCommand> {
        ControlCommand::from_u16(self.command)
    }
}

/// A parameter command sent to the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterRequest {
    /// Read the register `id`
    Read { id: u16 },
    /// Write `value` to the register `id`
    Set { id: u16, value: u16 },
}

impl ParameterRequest {
    /// Encode the request into a control frame
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Self::Read { id } => encode_frame(ControlCommand::ReadParameter, &[id]),
            Self::Set { id, value } => encode_frame(ControlCommand::SetParameter, &[id, value]),
        }
    }
}

/// A decoded camera response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterResponse {
    /// Response header
    pub header: ControlHeader,
    /// Values following the header, exactly `header.words` of them
    pub values: Vec<u16>,
}

impl ParameterResponse {
    /// Whether the response is a single zero acknowledgement
    pub fn is_ack(&self) -> bool {
        self.values == [0]
    }
}

fn encode_frame(command: ControlCommand, values: &[u16]) -> Vec<u8> {
    let header = ControlHeader::request(command, values.len() as u16);

    let mut frame = Vec::with_capacity(header.frame_len());
    frame.extend_from_slice(&header.to_bytes());
    for value in values {
        let mut word = [0u8; 2];
        LittleEndian::write_u16(&mut word, *value);
        frame.extend_from_slice(&word);
    }
    frame
}

/// Encode a "set parameter" command
///
/// # Example
/// ```
/// use protocol::encode_set_parameter;
///
/// let frame = encode_set_parameter(0x14, 0x1e);
/// assert_eq!(frame, [b'G', b'M', 2, 0, 3, 0, 0, 0, 0x14, 0, 0x1e, 0]);
/// ```
pub fn encode_set_parameter(id: u16, value: u16) -> Vec<u8> {
    ParameterRequest::Set { id, value }.encode()
}

/// Encode a "read parameter" command
pub fn encode_read_parameter(id: u16) -> Vec<u8> {
    ParameterRequest::Read { id }.encode()
}

/// Decode a camera response
///
/// Fails with [`ProtocolError::TruncatedFrame`] when `bytes` is shorter than
/// the header plus the declared number of values. Trailing bytes beyond the
/// declared values are ignored.
///
/// # Example
/// ```
/// use protocol::decode_response;
///
/// let response = decode_response(&[b'R', b'B', 1, 0, 3, 0, 0, 0, 0, 0]).unwrap();
/// assert_eq!(response.values, vec![0]);
/// ```
pub fn decode_response(bytes: &[u8]) -> Result<ParameterResponse> {
    let header = ControlHeader::from_bytes(bytes)?;

    let expected = header.frame_len();
    if bytes.len() < expected {
        return Err(ProtocolError::TruncatedFrame {
            expected,
            actual: bytes.len(),
        });
    }

    let values = bytes[ControlHeader::SIZE..expected]
        .chunks_exact(2)
        .map(LittleEndian::read_u16)
        .collect();

    Ok(ParameterResponse { header, values })
}

/// Header found at the start of camera data packets
///
/// Not needed to detect frame arrival; exposed for callers that inspect the
/// raw depth buffers themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFrameHeader {
    pub magic: [u8; 2],
    pub control: u8,
    pub command: u8,
    pub sequence: u8,
    pub packet_sequence: u8,
    pub length_high: u8,
    pub length_low: u8,
    /// Device timestamp
    pub time: u32,
}

impl CameraFrameHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = 12;

    /// Parse a header from the start of `bytes`, requiring the `"RB"` magic
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(ProtocolError::TruncatedFrame {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }

        let magic = [bytes[0], bytes[1]];
        if magic != FRAME_MAGIC {
            return Err(ProtocolError::BadMagic {
                found: magic,
                expected: FRAME_MAGIC,
            });
        }

        Ok(Self {
            magic,
            control: bytes[2],
            command: bytes[3],
            sequence: bytes[4],
            packet_sequence: bytes[5],
            length_high: bytes[6],
            length_low: bytes[7],
            time: LittleEndian::read_u32(&bytes[8..12]),
        })
    }

    /// Length field reassembled from its two bytes
    pub fn length(&self) -> u16 {
        u16::from_be_bytes([self.length_high, self.length_low])
    }
}
