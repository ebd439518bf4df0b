//! Integration tests for the camera control codec
//!
//! Covers request layout, response decoding against synthetic firmware
//! replies, and robustness of the decoder against arbitrary input.
//!
//! Run with: `cargo test -p protocol --test codec_tests`

use protocol::{
    ControlCommand, ControlHeader, ParameterRequest, ProtocolError, decode_response,
    encode_read_parameter, encode_set_parameter,
};
use proptest::prelude::*;

/// Build a firmware-style reply carrying `values`
fn synthetic_response(command: u16, values: &[u16]) -> Vec<u8> {
    let header = ControlHeader {
        magic: *b"RB",
        words: values.len() as u16,
        command,
        tag: 0,
    };
    let mut bytes = header.to_bytes().to_vec();
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

mod requests {
    use super::*;

    #[test]
    fn test_set_parameter_header_fields_survive_decoding() {
        let frame = encode_set_parameter(0x12, 0x02);
        let decoded = decode_response(&frame).expect("request frames are well formed");

        assert_eq!(decoded.header.magic, *b"GM");
        assert_eq!(decoded.header.words, 2);
        assert_eq!(decoded.header.command, ControlCommand::SetParameter as u16);
        assert_eq!(decoded.values, vec![0x12, 0x02]);
    }

    #[test]
    fn test_synthetic_reply_matches_request_header() {
        let request = decode_response(&encode_set_parameter(0x14, 0x1e)).unwrap();
        let reply = decode_response(&synthetic_response(request.header.command, &[0, 0])).unwrap();

        assert_eq!(reply.header.words, request.header.words);
        assert_eq!(reply.header.command, request.header.command);
        assert_eq!(reply.values.len(), request.header.words as usize);
    }

    #[test]
    fn test_read_parameter_is_one_word() {
        let frame = encode_read_parameter(0x105);
        assert_eq!(frame.len(), ControlHeader::SIZE + 2);

        let decoded = decode_response(&frame).unwrap();
        assert_eq!(decoded.header.command_kind(), Some(ControlCommand::ReadParameter));
        assert_eq!(decoded.values, vec![0x105]);
    }

    #[test]
    fn test_parameter_request_matches_free_functions() {
        assert_eq!(
            ParameterRequest::Set { id: 7, value: 9 }.encode(),
            encode_set_parameter(7, 9)
        );
        assert_eq!(
            ParameterRequest::Read { id: 7 }.encode(),
            encode_read_parameter(7)
        );
    }
}

mod responses {
    use super::*;

    #[test]
    fn test_multi_value_reply() {
        let reply = decode_response(&synthetic_response(2, &[0x0001, 0xfffe, 0x1234])).unwrap();
        assert_eq!(reply.values, vec![0x0001, 0xfffe, 0x1234]);
        assert!(!reply.is_ack());
    }

    #[test]
    fn test_empty_reply() {
        let reply = decode_response(&synthetic_response(3, &[])).unwrap();
        assert!(reply.values.is_empty());
        assert!(!reply.is_ack());
    }

    #[test]
    fn test_reply_one_byte_short() {
        let mut bytes = synthetic_response(3, &[0, 0]);
        bytes.pop();

        match decode_response(&bytes) {
            Err(ProtocolError::TruncatedFrame { expected, actual }) => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 11);
            }
            other => panic!("expected TruncatedFrame, got {:?}", other),
        }
    }
}

proptest! {
    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_response(&bytes);
    }

    #[test]
    fn decode_rejects_short_buffers(
        words in 1u16..32,
        values in proptest::collection::vec(any::<u16>(), 32),
        cut in 1usize..64,
    ) {
        let full = synthetic_response(3, &values[..words as usize]);
        let cut = cut.min(full.len());
        let short = &full[..full.len() - cut];

        let is_truncated = matches!(
            decode_response(short),
            Err(ProtocolError::TruncatedFrame { .. })
        );
        prop_assert!(is_truncated);
    }

    #[test]
    fn decoded_value_count_matches_header(values in proptest::collection::vec(any::<u16>(), 0..32)) {
        let reply = decode_response(&synthetic_response(2, &values)).unwrap();
        prop_assert_eq!(reply.values.len(), reply.header.words as usize);
        prop_assert_eq!(reply.values, values);
    }
}
