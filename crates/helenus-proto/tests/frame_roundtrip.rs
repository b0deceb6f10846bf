//! End-to-end frame codec scenarios.
//!
//! Each test drives the public codec surface the way a connection layer
//! would: build a frame, encode it, inspect the exact bytes where the wire
//! format is pinned, and decode back to a structurally equal frame.

use std::collections::HashMap;

use helenus_proto::{
    messages::{
        auth::{AuthChallenge, AuthResponse, AuthSuccess, Authenticate},
        event::{
            Event, SchemaChangeEvent, StatusChangeEvent, SCHEMA_CHANGE_CREATED,
            SCHEMA_CHANGE_TARGET_FUNCTION, SCHEMA_CHANGE_TARGET_TABLE, STATUS_CHANGE_UP,
        },
        Message,
    },
    CodecError, CodecRegistry, Compressor, Frame, FrameCodec, HeaderFlags, Lz4Compressor,
    ProtocolVersion, Result, SnappyCompressor, HEADER_LENGTH,
};
use uuid::Uuid;

fn status_change_up(address: &str) -> Message {
    Message::Event(Event::StatusChange(StatusChangeEvent {
        change_type: STATUS_CHANGE_UP.to_owned(),
        address: address.parse().unwrap(),
    }))
}

fn codec() -> FrameCodec {
    FrameCodec::new(CodecRegistry::new())
}

fn lz4_codec() -> FrameCodec {
    FrameCodec::with_compressor(CodecRegistry::new(), Box::new(Lz4Compressor))
}

fn round_trip(codec: &FrameCodec, frame: &Frame) -> Vec<u8> {
    let encoded = codec.encode(frame).expect("encode should succeed");
    let mut cursor = &encoded[..];
    let decoded = codec.decode(&mut cursor).expect("decode should succeed");
    assert_eq!(&decoded, frame);
    assert!(cursor.is_empty(), "decode should consume the whole frame");
    encoded
}

#[test]
fn ready_response_v4() {
    let frame = Frame::new(ProtocolVersion::V4, 0, Message::Ready);
    let encoded = round_trip(&codec(), &frame);
    assert_eq!(encoded, [0x84, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00]);
}

#[test]
fn auth_challenge_v4() {
    let frame = Frame::new(
        ProtocolVersion::V4,
        0,
        Message::AuthChallenge(AuthChallenge { token: Some(vec![0x01, 0x02, 0x03]) }),
    );
    let encoded = round_trip(&codec(), &frame);
    assert_eq!(&encoded[..HEADER_LENGTH], [0x84, 0x00, 0x00, 0x00, 0x0E, 0x00, 0x00, 0x00, 0x07]);
    assert_eq!(&encoded[HEADER_LENGTH..], [0x00, 0x00, 0x00, 0x03, 0x01, 0x02, 0x03]);
}

#[test]
fn schema_change_event_v3() {
    let table_change = |target: &str| {
        Frame::new(
            ProtocolVersion::V3,
            0,
            Message::Event(Event::SchemaChange(SchemaChangeEvent {
                change_type: SCHEMA_CHANGE_CREATED.to_owned(),
                target: target.to_owned(),
                keyspace: "ks".to_owned(),
                object: "t".to_owned(),
                arguments: Vec::new(),
            })),
        )
    };

    let encoded = round_trip(&codec(), &table_change(SCHEMA_CHANGE_TARGET_TABLE));
    let mut expected_body = Vec::new();
    for part in ["SCHEMA_CHANGE", "CREATED", "TABLE", "ks", "t"] {
        expected_body.extend_from_slice(&(part.len() as u16).to_be_bytes());
        expected_body.extend_from_slice(part.as_bytes());
    }
    assert_eq!(&encoded[HEADER_LENGTH..], expected_body);

    // FUNCTION targets are a v4 feature.
    assert!(matches!(
        codec().encode(&table_change(SCHEMA_CHANGE_TARGET_FUNCTION)),
        Err(CodecError::VersionFeatureMismatch { .. })
    ));
}

#[test]
fn status_change_event_body_bytes() {
    let frame = Frame::new(ProtocolVersion::V4, 0, status_change_up("127.0.0.1:9042"));
    let encoded = round_trip(&codec(), &frame);

    let mut expected_body = Vec::new();
    expected_body.extend_from_slice(&[0x00, 0x0D]);
    expected_body.extend_from_slice(b"STATUS_CHANGE");
    expected_body.extend_from_slice(&[0x00, 0x02]);
    expected_body.extend_from_slice(b"UP");
    expected_body.extend_from_slice(&[0x04, 0x7F, 0x00, 0x00, 0x01]);
    expected_body.extend_from_slice(&9042i32.to_be_bytes());
    assert_eq!(&encoded[HEADER_LENGTH..], expected_body);
}

#[test]
fn compressed_event_with_lz4() {
    let frame = Frame::new(ProtocolVersion::V4, 1, status_change_up("10.1.2.3:9042"));

    let compressed = lz4_codec().encode(&frame).expect("encode should succeed");
    assert_eq!(compressed[1] & HeaderFlags::COMPRESSED.to_byte(), 0x01);

    // The declared body length is the compressed length of the exact
    // uncompressed body an uncompressed codec would produce.
    let plain = codec().encode(&frame).expect("encode should succeed");
    let recompressed = Lz4Compressor.compress(&plain[HEADER_LENGTH..]).unwrap();
    let declared = i32::from_be_bytes(compressed[5..9].try_into().unwrap()) as usize;
    assert_eq!(declared, recompressed.len());
    assert_eq!(declared, compressed.len() - HEADER_LENGTH);

    let mut cursor = &compressed[..];
    assert_eq!(lz4_codec().decode(&mut cursor).unwrap(), frame);
}

#[test]
fn snappy_frames_round_trip() {
    let snappy = FrameCodec::with_compressor(CodecRegistry::new(), Box::new(SnappyCompressor));
    round_trip(
        &snappy,
        &Frame::new(
            ProtocolVersion::V4,
            12,
            Message::AuthSuccess(AuthSuccess { token: Some(vec![0xC0, 0xFF, 0xEE]) }),
        ),
    );
}

/// Any compressor satisfying decompress(compress(x)) = x keeps round trips
/// intact; the codec never depends on the transform beyond that.
struct XorCompressor;

impl Compressor for XorCompressor {
    fn algorithm(&self) -> &'static str {
        "xor"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.iter().map(|b| b ^ 0x5A).collect())
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        Ok(compressed.iter().map(|b| b ^ 0x5A).collect())
    }
}

#[test]
fn compression_is_transparent_to_round_trips() {
    let xor = FrameCodec::with_compressor(CodecRegistry::new(), Box::new(XorCompressor));
    round_trip(
        &xor,
        &Frame::new(
            ProtocolVersion::V4,
            -7,
            Message::Authenticate(Authenticate { authenticator: "auth".to_owned() }),
        ),
    );
}

#[test]
fn compressed_frame_without_compressor_fails() {
    let frame = Frame::new(ProtocolVersion::V4, 1, Message::Ready);
    let encoded = lz4_codec().encode(&frame).unwrap();
    let mut cursor = &encoded[..];
    assert!(matches!(codec().decode(&mut cursor), Err(CodecError::Compressor(_))));
}

#[test]
fn tracing_and_warnings_response() {
    let tracing_id = Uuid::from_bytes([0x42; 16]);
    let frame = Frame::new(ProtocolVersion::V4, 99, Message::Ready)
        .with_tracing_id(tracing_id)
        .with_warnings(vec!["aggregation without partition key".to_owned()]);

    let encoded = round_trip(&codec(), &frame);
    assert_eq!(encoded[1], (HeaderFlags::TRACING | HeaderFlags::WARNING).to_byte());
    // Body opens with the 16-byte tracing id, then the warnings list.
    assert_eq!(&encoded[HEADER_LENGTH..HEADER_LENGTH + 16], [0x42; 16]);
    assert_eq!(&encoded[HEADER_LENGTH + 16..HEADER_LENGTH + 18], [0x00, 0x01]);
}

#[test]
fn custom_payload_round_trips_at_v4() {
    let mut payload = HashMap::new();
    payload.insert("page-hint".to_owned(), vec![0xDE, 0xAD]);
    let frame =
        Frame::new(ProtocolVersion::V4, 5, Message::Ready).with_custom_payload(payload);

    let encoded = round_trip(&codec(), &frame);
    assert_eq!(encoded[1], HeaderFlags::CUSTOM_PAYLOAD.to_byte());
}

#[test]
fn all_prefixes_together_keep_their_order() {
    let mut payload = HashMap::new();
    payload.insert("k".to_owned(), vec![0x01]);
    let frame = Frame::new(ProtocolVersion::V4, 0, Message::Ready)
        .with_tracing_id(Uuid::from_bytes([0x10; 16]))
        .with_custom_payload(payload)
        .with_warnings(vec!["w".to_owned()]);

    let encoded = round_trip(&codec(), &frame);
    assert_eq!(
        encoded[1],
        (HeaderFlags::TRACING | HeaderFlags::CUSTOM_PAYLOAD | HeaderFlags::WARNING).to_byte()
    );
    // Tracing id first, custom payload second: the map's entry count short
    // follows immediately after the uuid.
    assert_eq!(&encoded[HEADER_LENGTH..HEADER_LENGTH + 16], [0x10; 16]);
    assert_eq!(&encoded[HEADER_LENGTH + 16..HEADER_LENGTH + 18], [0x00, 0x01]);
}

#[test]
fn stream_id_extremes_round_trip() {
    for stream_id in [i16::MIN, i16::MIN + 1, -1, 0, 1, i16::MAX - 1, i16::MAX] {
        let frame = Frame::new(ProtocolVersion::V4, stream_id, Message::Ready);
        let encoded = round_trip(&codec(), &frame);
        assert_eq!(i16::from_be_bytes(encoded[2..4].try_into().unwrap()), stream_id);
    }
}

#[test]
fn empty_and_absent_tokens_are_distinct() {
    let absent =
        Frame::new(ProtocolVersion::V4, 0, Message::AuthChallenge(AuthChallenge { token: None }));
    let empty = Frame::new(
        ProtocolVersion::V4,
        0,
        Message::AuthChallenge(AuthChallenge { token: Some(Vec::new()) }),
    );

    let absent_bytes = round_trip(&codec(), &absent);
    let empty_bytes = round_trip(&codec(), &empty);
    assert_ne!(absent_bytes, empty_bytes);
    assert_eq!(&absent_bytes[HEADER_LENGTH..], 0xFF_FF_FF_FFu32.to_be_bytes());
    assert_eq!(&empty_bytes[HEADER_LENGTH..], [0x00; 4]);
}

#[test]
fn empty_warning_list_round_trips() {
    let frame = Frame::new(ProtocolVersion::V4, 0, Message::Ready).with_warnings(Vec::new());
    let encoded = round_trip(&codec(), &frame);
    assert_eq!(encoded[1], HeaderFlags::WARNING.to_byte());
    assert_eq!(&encoded[HEADER_LENGTH..], [0x00, 0x00]);
}

#[test]
fn truncated_input_is_a_short_read_at_every_length() {
    let frame = Frame::new(
        ProtocolVersion::V4,
        3,
        Message::AuthChallenge(AuthChallenge { token: Some(vec![0xAB; 8]) }),
    );
    let encoded = codec().encode(&frame).unwrap();

    for len in 0..encoded.len() {
        let mut cursor = &encoded[..len];
        assert!(
            matches!(codec().decode(&mut cursor), Err(CodecError::ShortRead { .. })),
            "prefix of {len} bytes should be a short read",
        );
    }
}

#[test]
fn requests_round_trip_with_clear_direction_bit() {
    let frame = Frame::new(
        ProtocolVersion::V4,
        8,
        Message::AuthResponse(AuthResponse { token: Some(vec![0x73, 0x65]) }),
    );
    let encoded = round_trip(&codec(), &frame);
    assert_eq!(encoded[0], 0x04);
}

#[test]
fn every_version_round_trips_its_frames() {
    let table_change = Message::Event(Event::SchemaChange(SchemaChangeEvent {
        change_type: SCHEMA_CHANGE_CREATED.to_owned(),
        target: SCHEMA_CHANGE_TARGET_TABLE.to_owned(),
        keyspace: "ks".to_owned(),
        object: "t".to_owned(),
        arguments: Vec::new(),
    }));
    for version in [ProtocolVersion::V3, ProtocolVersion::V4, ProtocolVersion::V5Beta] {
        round_trip(&codec(), &Frame::new(version, 11, Message::Ready));
        round_trip(&codec(), &Frame::new(version, -11, table_change.clone()));
    }
}
