//! The frame codec: header layout, flag derivation and body assembly.
//!
//! Wire layout of the 9-byte header, all fields big-endian:
//!
//! ```text
//! offset 0  : 1 byte  : direction<<7 | version
//! offset 1  : 1 byte  : flags bitmask
//! offset 2-3: 2 bytes : stream id (signed)
//! offset 4  : 1 byte  : opcode
//! offset 5-8: 4 bytes : body length (signed, negative is invalid)
//! ```
//!
//! The body starts with the optional prefixes, each present iff its flag is
//! set, in mandatory order: tracing id (responses only), custom payload,
//! warnings, then the message body. When the compressed flag is set the
//! whole body, prefixes included, is one compressed blob.
//!
//! Encoding computes the exact body length first and preallocates a single
//! output buffer, so the length predictors of every codec must agree with
//! their writers byte for byte.
//!
//! The codec is stateless after construction: the registry and compressor
//! are immutable, every call works on caller-supplied and local buffers,
//! and a shared instance may be used from multiple threads as long as the
//! injected compressor is itself concurrency-safe.

use bytes::Buf;

use crate::{
    compression::Compressor,
    errors::{CodecError, Result},
    flags::HeaderFlags,
    frame::{Frame, FrameBody, FrameHeader},
    opcodes::Opcode,
    primitives,
    registry::CodecRegistry,
    version::ProtocolVersion,
};

/// Encoded length of the frame header.
pub const HEADER_LENGTH: usize = 9;

const DIRECTION_RESPONSE: u8 = 0x80;
const VERSION_MASK: u8 = 0x7F;

/// Encoder/decoder for whole frames.
///
/// Holds the injected codec registry and an optional body compressor.
/// STARTUP and OPTIONS frames are never compressed: they are the frames
/// that negotiate the compressor in the first place.
pub struct FrameCodec {
    registry: CodecRegistry,
    compressor: Option<Box<dyn Compressor>>,
}

impl FrameCodec {
    /// A codec over `registry` with no body compression.
    #[must_use]
    pub fn new(registry: CodecRegistry) -> Self {
        Self { registry, compressor: None }
    }

    /// A codec over `registry` compressing bodies with `compressor`.
    #[must_use]
    pub fn with_compressor(registry: CodecRegistry, compressor: Box<dyn Compressor>) -> Self {
        Self { registry, compressor: Some(compressor) }
    }

    /// The configured compressor, if any.
    #[must_use]
    pub fn compressor(&self) -> Option<&dyn Compressor> {
        self.compressor.as_deref()
    }

    /// Encode `frame` into a freshly allocated buffer.
    ///
    /// # Errors
    ///
    /// Fails with `VersionFeatureMismatch` for custom payloads or warnings
    /// below protocol v4, `TypeMismatch` when the header opcode does not
    /// match the message, `UnsupportedOpcode` when no codec is registered,
    /// and whatever the message codec or compressor reports. On error no
    /// bytes are returned.
    pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>> {
        let version = frame.header.version;
        if version < ProtocolVersion::V4 && frame.body.custom_payload.is_some() {
            return Err(CodecError::VersionFeatureMismatch {
                feature: "custom payloads",
                version,
            });
        }
        if version < ProtocolVersion::V4 && frame.body.warnings.is_some() {
            return Err(CodecError::VersionFeatureMismatch { feature: "warnings", version });
        }
        if frame.header.opcode != frame.body.message.opcode() {
            return Err(CodecError::TypeMismatch {
                expected: frame.header.opcode,
                actual: frame.body.message.kind(),
            });
        }

        match self.compressor.as_deref() {
            Some(compressor) if self.should_compress(frame) => {
                self.encode_compressed(frame, compressor)
            },
            _ => self.encode_uncompressed(frame),
        }
    }

    /// Decode one frame from `src`, leaving any trailing bytes unread.
    ///
    /// # Errors
    ///
    /// Fails with `ShortRead` when fewer than 9 header bytes or fewer body
    /// bytes than declared are available, `UnsupportedVersion` and
    /// `UnsupportedOpcode` for unknown discriminators, `InvalidFlag` for
    /// flag bits the version does not permit (or a missing use-beta flag),
    /// and whatever the message codec or compressor reports. On error no
    /// frame is returned.
    pub fn decode(&self, src: &mut impl Buf) -> Result<Frame> {
        if src.remaining() < HEADER_LENGTH {
            return Err(CodecError::ShortRead {
                needed: HEADER_LENGTH,
                remaining: src.remaining(),
            });
        }
        let version_and_direction = src.get_u8();
        let is_response = version_and_direction & DIRECTION_RESPONSE != 0;
        let version_byte = version_and_direction & VERSION_MASK;
        let version = ProtocolVersion::from_wire(version_byte)
            .ok_or(CodecError::UnsupportedVersion(version_byte))?;
        let flags = HeaderFlags::from_byte(src.get_u8());
        let stream_id = src.get_i16();
        let opcode_byte = src.get_u8();
        let opcode =
            Opcode::from_u8(opcode_byte).ok_or(CodecError::UnsupportedOpcode(opcode_byte))?;
        let body_length = src.get_i32();

        Self::check_flags(version, flags)?;
        if body_length < 0 {
            return Err(CodecError::InvalidEncoding(format!(
                "negative body length: {body_length}"
            )));
        }
        let body_length = body_length as usize;
        if src.remaining() < body_length {
            return Err(CodecError::ShortRead { needed: body_length, remaining: src.remaining() });
        }
        let mut body = vec![0u8; body_length];
        src.copy_to_slice(&mut body);

        if flags.contains(HeaderFlags::COMPRESSED) {
            let compressor = self.compressor.as_deref().ok_or_else(|| {
                CodecError::Compressor(
                    "compressed frame received but no compressor is configured".to_owned(),
                )
            })?;
            body = compressor.decompress(&body)?;
        }

        let mut cursor: &[u8] = &body;
        let mut tracing_id = None;
        let mut tracing_requested = false;
        if flags.contains(HeaderFlags::TRACING) {
            if is_response {
                tracing_id = Some(primitives::read_uuid(&mut cursor)?);
            } else {
                tracing_requested = true;
            }
        }
        let custom_payload = if flags.contains(HeaderFlags::CUSTOM_PAYLOAD) {
            Some(primitives::read_bytes_map(&mut cursor)?)
        } else {
            None
        };
        let warnings = if flags.contains(HeaderFlags::WARNING) {
            Some(primitives::read_string_list(&mut cursor)?)
        } else {
            None
        };

        let message = self.registry.get(opcode)?.decode(&mut cursor, version)?;
        // Trailing body bytes are ignored for forward compatibility.

        Ok(Frame {
            header: FrameHeader { version, stream_id, opcode, tracing_requested },
            body: FrameBody { message, tracing_id, custom_payload, warnings },
        })
    }

    fn should_compress(&self, frame: &Frame) -> bool {
        self.compressor.is_some()
            && !matches!(frame.body.message.opcode(), Opcode::Startup | Opcode::Options)
    }

    fn check_flags(version: ProtocolVersion, flags: HeaderFlags) -> Result<()> {
        if version < ProtocolVersion::V4 {
            if flags.contains(HeaderFlags::CUSTOM_PAYLOAD) {
                return Err(CodecError::InvalidFlag {
                    flags: flags.to_byte(),
                    reason: "custom payload flag requires protocol version 4",
                });
            }
            if flags.contains(HeaderFlags::WARNING) {
                return Err(CodecError::InvalidFlag {
                    flags: flags.to_byte(),
                    reason: "warning flag requires protocol version 4",
                });
            }
        }
        if version.is_beta() && !flags.contains(HeaderFlags::USE_BETA) {
            return Err(CodecError::InvalidFlag {
                flags: flags.to_byte(),
                reason: "beta protocol version requires the use-beta flag",
            });
        }
        if !version.is_beta() && flags.contains(HeaderFlags::USE_BETA) {
            return Err(CodecError::InvalidFlag {
                flags: flags.to_byte(),
                reason: "use-beta flag set for a non-beta version",
            });
        }
        Ok(())
    }

    fn derive_flags(&self, frame: &Frame) -> HeaderFlags {
        let mut flags = HeaderFlags::empty();
        if self.should_compress(frame) {
            flags |= HeaderFlags::COMPRESSED;
        }
        if frame.body.tracing_id.is_some() || frame.header.tracing_requested {
            flags |= HeaderFlags::TRACING;
        }
        if frame.body.custom_payload.is_some() {
            flags |= HeaderFlags::CUSTOM_PAYLOAD;
        }
        if frame.body.warnings.is_some() {
            flags |= HeaderFlags::WARNING;
        }
        if frame.header.version.is_beta() {
            flags |= HeaderFlags::USE_BETA;
        }
        flags
    }

    fn uncompressed_body_length(&self, frame: &Frame) -> Result<usize> {
        let codec = self.registry.get(frame.body.message.opcode())?;
        let mut length = codec.encoded_length(&frame.body.message, frame.header.version)?;
        if frame.body.message.is_response() && frame.body.tracing_id.is_some() {
            length += primitives::LENGTH_OF_UUID;
        }
        if let Some(custom_payload) = &frame.body.custom_payload {
            length += primitives::length_of_bytes_map(custom_payload);
        }
        if let Some(warnings) = &frame.body.warnings {
            length += primitives::length_of_string_list(warnings);
        }
        Ok(length)
    }

    fn encode_header(&self, frame: &Frame, body_length: usize, dst: &mut Vec<u8>) -> Result<()> {
        let mut version_and_direction = frame.header.version.to_wire();
        if frame.body.message.is_response() {
            version_and_direction |= DIRECTION_RESPONSE;
        }
        primitives::write_byte(version_and_direction, dst)?;
        primitives::write_byte(self.derive_flags(frame).to_byte(), dst)?;
        primitives::write_short(frame.header.stream_id as u16, dst)?;
        primitives::write_byte(frame.header.opcode.to_u8(), dst)?;
        if body_length > i32::MAX as usize {
            return Err(CodecError::InvalidEncoding(format!(
                "body of {body_length} bytes exceeds the header length field range"
            )));
        }
        primitives::write_int(body_length as i32, dst)
    }

    fn encode_body(&self, frame: &Frame, dst: &mut Vec<u8>) -> Result<()> {
        if frame.body.message.is_response() {
            if let Some(tracing_id) = &frame.body.tracing_id {
                primitives::write_uuid(tracing_id, dst)?;
            }
        }
        if let Some(custom_payload) = &frame.body.custom_payload {
            primitives::write_bytes_map(custom_payload, dst)?;
        }
        if let Some(warnings) = &frame.body.warnings {
            primitives::write_string_list(warnings, dst)?;
        }
        let codec = self.registry.get(frame.body.message.opcode())?;
        codec.encode(&frame.body.message, dst, frame.header.version)
    }

    fn encode_uncompressed(&self, frame: &Frame) -> Result<Vec<u8>> {
        let body_length = self.uncompressed_body_length(frame)?;
        let mut out = Vec::with_capacity(HEADER_LENGTH + body_length);
        self.encode_header(frame, body_length, &mut out)?;
        self.encode_body(frame, &mut out)?;
        debug_assert_eq!(out.len(), HEADER_LENGTH + body_length);
        Ok(out)
    }

    fn encode_compressed(&self, frame: &Frame, compressor: &dyn Compressor) -> Result<Vec<u8>> {
        let body_length = self.uncompressed_body_length(frame)?;
        let mut body = Vec::with_capacity(body_length);
        self.encode_body(frame, &mut body)?;
        debug_assert_eq!(body.len(), body_length);

        let compressed = compressor.compress(&body)?;
        let mut out = Vec::with_capacity(HEADER_LENGTH + compressed.len());
        self.encode_header(frame, compressed.len(), &mut out)?;
        out.extend_from_slice(&compressed);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::messages::{
        auth::{AuthChallenge, AuthResponse},
        event::{Event, StatusChangeEvent},
        Message,
    };

    fn codec() -> FrameCodec {
        FrameCodec::new(CodecRegistry::new())
    }

    fn round_trip(codec: &FrameCodec, frame: &Frame) {
        let encoded = codec.encode(frame).expect("encode should succeed");
        let mut cursor = &encoded[..];
        let decoded = codec.decode(&mut cursor).expect("decode should succeed");
        assert_eq!(&decoded, frame);
        assert!(cursor.is_empty());
    }

    #[test]
    fn ready_frame_exact_bytes() {
        let frame = Frame::new(ProtocolVersion::V4, 0, Message::Ready);
        let encoded = codec().encode(&frame).unwrap();
        assert_eq!(encoded, [0x84, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00]);
        round_trip(&codec(), &frame);
    }

    #[test]
    fn request_direction_bit_clear() {
        let frame =
            Frame::new(ProtocolVersion::V4, 1, Message::AuthResponse(AuthResponse { token: None }));
        let encoded = codec().encode(&frame).unwrap();
        assert_eq!(encoded[0], 0x04);
    }

    #[test]
    fn declared_body_length_matches_body() {
        let frame = Frame::new(
            ProtocolVersion::V4,
            2,
            Message::AuthChallenge(AuthChallenge { token: Some(vec![1, 2, 3]) }),
        );
        let encoded = codec().encode(&frame).unwrap();
        let declared = i32::from_be_bytes(encoded[5..9].try_into().unwrap());
        assert_eq!(declared as usize, encoded.len() - HEADER_LENGTH);
    }

    #[test]
    fn stream_id_covers_signed_range() {
        for stream_id in [i16::MIN, -1, 0, 1, i16::MAX] {
            let frame = Frame::new(ProtocolVersion::V4, stream_id, Message::Ready);
            round_trip(&codec(), &frame);
        }
    }

    #[test]
    fn mismatched_header_opcode_rejected() {
        let mut frame = Frame::new(ProtocolVersion::V4, 0, Message::Ready);
        frame.header.opcode = Opcode::Options;
        assert_eq!(
            codec().encode(&frame),
            Err(CodecError::TypeMismatch { expected: Opcode::Options, actual: "READY" })
        );
    }

    #[test]
    fn custom_payload_rejected_before_v4() {
        let frame = Frame::new(ProtocolVersion::V3, 0, Message::Ready)
            .with_custom_payload([("k".to_owned(), vec![1u8])].into_iter().collect());
        assert_eq!(
            codec().encode(&frame),
            Err(CodecError::VersionFeatureMismatch {
                feature: "custom payloads",
                version: ProtocolVersion::V3,
            })
        );
    }

    #[test]
    fn warnings_rejected_before_v4() {
        let frame = Frame::new(ProtocolVersion::V3, 0, Message::Ready)
            .with_warnings(vec!["w".to_owned()]);
        assert_eq!(
            codec().encode(&frame),
            Err(CodecError::VersionFeatureMismatch {
                feature: "warnings",
                version: ProtocolVersion::V3,
            })
        );
    }

    #[test]
    fn v3_decode_rejects_v4_flags() {
        // READY response, v3, with the warning flag set.
        let raw = [0x83, 0x08, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        let mut cursor = &raw[..];
        assert!(matches!(codec().decode(&mut cursor), Err(CodecError::InvalidFlag { .. })));

        // Same with the custom payload flag.
        let raw = [0x83, 0x04, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        let mut cursor = &raw[..];
        assert!(matches!(codec().decode(&mut cursor), Err(CodecError::InvalidFlag { .. })));
    }

    #[test]
    fn beta_version_sets_and_requires_use_beta_flag() {
        let frame = Frame::new(ProtocolVersion::V5Beta, 0, Message::Ready);
        let encoded = codec().encode(&frame).unwrap();
        assert_eq!(encoded[0], 0x85);
        assert_eq!(encoded[1], HeaderFlags::USE_BETA.to_byte());
        round_trip(&codec(), &frame);

        // Clearing the flag must fail the decode.
        let mut tampered = encoded;
        tampered[1] = 0x00;
        let mut cursor = &tampered[..];
        assert!(matches!(codec().decode(&mut cursor), Err(CodecError::InvalidFlag { .. })));
    }

    #[test]
    fn use_beta_flag_on_v4_rejected() {
        let raw = [0x84, 0x10, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        let mut cursor = &raw[..];
        assert!(matches!(codec().decode(&mut cursor), Err(CodecError::InvalidFlag { .. })));
    }

    #[test]
    fn unknown_version_rejected() {
        let raw = [0x82, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        let mut cursor = &raw[..];
        assert_eq!(codec().decode(&mut cursor), Err(CodecError::UnsupportedVersion(2)));
    }

    #[test]
    fn truncated_header_and_body_are_short_reads() {
        let mut cursor = &[0x84u8, 0x00, 0x00][..];
        assert_eq!(
            codec().decode(&mut cursor),
            Err(CodecError::ShortRead { needed: HEADER_LENGTH, remaining: 3 })
        );

        // Header declares 7 body bytes, none follow.
        let raw = [0x84, 0x00, 0x00, 0x00, 0x0E, 0x00, 0x00, 0x00, 0x07];
        let mut cursor = &raw[..];
        assert_eq!(
            codec().decode(&mut cursor),
            Err(CodecError::ShortRead { needed: 7, remaining: 0 })
        );
    }

    #[test]
    fn negative_body_length_rejected() {
        let raw = [0x84, 0x00, 0x00, 0x00, 0x02, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut cursor = &raw[..];
        assert!(matches!(codec().decode(&mut cursor), Err(CodecError::InvalidEncoding(_))));
    }

    #[test]
    fn unregistered_opcode_fails_encode_and_decode() {
        let empty = FrameCodec::new(CodecRegistry::builder().build());
        let frame = Frame::new(ProtocolVersion::V4, 0, Message::Ready);
        assert_eq!(empty.encode(&frame), Err(CodecError::UnsupportedOpcode(0x02)));

        let raw = [0x84, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        let mut cursor = &raw[..];
        assert_eq!(empty.decode(&mut cursor), Err(CodecError::UnsupportedOpcode(0x02)));
    }

    #[test]
    fn tracing_requested_round_trips_on_requests() {
        let frame =
            Frame::new(ProtocolVersion::V4, 9, Message::AuthResponse(AuthResponse { token: None }))
                .with_tracing_requested();
        let encoded = codec().encode(&frame).unwrap();
        assert_eq!(encoded[1] & HeaderFlags::TRACING.to_byte(), 0x02);
        // No tracing id is serialized for requests: the body is just the
        // absent token.
        assert_eq!(encoded.len(), HEADER_LENGTH + 4);
        round_trip(&codec(), &frame);
    }

    #[test]
    fn tracing_id_on_request_is_not_serialized() {
        let frame =
            Frame::new(ProtocolVersion::V4, 0, Message::AuthResponse(AuthResponse { token: None }))
                .with_tracing_id(uuid::Uuid::from_bytes([0x11; 16]));
        let encoded = codec().encode(&frame).unwrap();
        assert_eq!(encoded.len(), HEADER_LENGTH + 4);
        let declared = i32::from_be_bytes(encoded[5..9].try_into().unwrap());
        assert_eq!(declared, 4);
    }

    proptest! {
        #[test]
        fn status_change_frames_round_trip(
            stream_id in any::<i16>(),
            octets in any::<[u8; 4]>(),
            port in any::<u16>(),
            up in any::<bool>(),
        ) {
            let change_type = if up { "UP" } else { "DOWN" };
            let frame = Frame::new(
                ProtocolVersion::V4,
                stream_id,
                Message::Event(Event::StatusChange(StatusChangeEvent {
                    change_type: change_type.to_owned(),
                    address: std::net::SocketAddr::new(
                        std::net::IpAddr::V4(std::net::Ipv4Addr::from(octets)),
                        port,
                    ),
                })),
            );
            let encoded = codec().encode(&frame).unwrap();
            let mut cursor = &encoded[..];
            prop_assert_eq!(codec().decode(&mut cursor).unwrap(), frame);
        }
    }
}
