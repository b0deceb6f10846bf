//! Frame data model.
//!
//! A [`Frame`] is the complete unit exchanged over the wire: a 9-byte
//! header plus a variable-length body. Frames are plain values: the codec
//! consumes them by reference when encoding and returns newly built ones
//! when decoding. The header's flags byte is not part of the model; it is
//! derived from the frame contents at encode time and consumed at decode
//! time.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{messages::Message, opcodes::Opcode, version::ProtocolVersion};

/// The fixed header of a frame.
///
/// # Invariants
///
/// - `opcode` always equals `body.message.opcode()` for frames built
///   through [`Frame::new`]; the encoder rejects hand-built frames that
///   violate this with `TypeMismatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version the frame is encoded with
    pub version: ProtocolVersion,
    /// Caller-chosen correlation id; opaque to the codec, copied verbatim
    pub stream_id: i16,
    /// Message discriminator, mirrors the body message
    pub opcode: Opcode,
    /// Forces the tracing flag on a request even without a tracing id.
    /// Set on decode when a request arrives with the tracing flag.
    pub tracing_requested: bool,
}

/// The variable part of a frame: the message plus its optional prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBody {
    /// The message carried by the frame
    pub message: Message,
    /// Tracing session id; only ever serialized on responses
    pub tracing_id: Option<Uuid>,
    /// Free-form key-to-bytes map, protocol v4+
    pub custom_payload: Option<HashMap<String, Vec<u8>>>,
    /// Server warnings, protocol v4+ responses
    pub warnings: Option<Vec<String>>,
}

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The fixed 9-byte header
    pub header: FrameHeader,
    /// The frame body
    pub body: FrameBody,
}

impl Frame {
    /// Build a frame around `message` with no optional body prefixes.
    ///
    /// The header opcode is taken from the message, so the frame satisfies
    /// the opcode invariant by construction.
    #[must_use]
    pub fn new(version: ProtocolVersion, stream_id: i16, message: Message) -> Self {
        let opcode = message.opcode();
        Self {
            header: FrameHeader { version, stream_id, opcode, tracing_requested: false },
            body: FrameBody { message, tracing_id: None, custom_payload: None, warnings: None },
        }
    }

    /// Attach a tracing id. Serialized only if the message is a response.
    #[must_use]
    pub fn with_tracing_id(mut self, tracing_id: Uuid) -> Self {
        self.body.tracing_id = Some(tracing_id);
        self
    }

    /// Request tracing for this frame even without a tracing id present.
    #[must_use]
    pub fn with_tracing_requested(mut self) -> Self {
        self.header.tracing_requested = true;
        self
    }

    /// Attach a custom payload (protocol v4+).
    #[must_use]
    pub fn with_custom_payload(mut self, custom_payload: HashMap<String, Vec<u8>>) -> Self {
        self.body.custom_payload = Some(custom_payload);
        self
    }

    /// Attach warnings (protocol v4+, responses).
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.body.warnings = Some(warnings);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_mirrors_message_opcode() {
        let frame = Frame::new(ProtocolVersion::V4, 7, Message::Ready);
        assert_eq!(frame.header.opcode, Opcode::Ready);
        assert_eq!(frame.header.stream_id, 7);
        assert!(!frame.header.tracing_requested);
        assert_eq!(frame.body.tracing_id, None);
    }

    #[test]
    fn builders_attach_prefix_fields() {
        let tracing_id = Uuid::from_bytes([0xAB; 16]);
        let frame = Frame::new(ProtocolVersion::V4, 0, Message::Ready)
            .with_tracing_id(tracing_id)
            .with_warnings(vec!["disk almost full".to_owned()]);
        assert_eq!(frame.body.tracing_id, Some(tracing_id));
        assert_eq!(frame.body.warnings.as_deref(), Some(&["disk almost full".to_owned()][..]));
    }
}
