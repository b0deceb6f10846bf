//! Server readiness.
//!
//! READY is the server's answer to a successful handshake on connections
//! that need no authentication. Its body is empty; the codec writes
//! nothing and predicts a length of zero.

use crate::{
    errors::{CodecError, Result},
    messages::{Message, MessageCodec},
    opcodes::Opcode,
    version::ProtocolVersion,
};

/// Codec for READY: an empty body.
pub struct ReadyCodec;

impl MessageCodec for ReadyCodec {
    fn opcode(&self) -> Opcode {
        Opcode::Ready
    }

    fn encode(
        &self,
        message: &Message,
        _dst: &mut Vec<u8>,
        _version: ProtocolVersion,
    ) -> Result<()> {
        match message {
            Message::Ready => Ok(()),
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn encoded_length(&self, message: &Message, _version: ProtocolVersion) -> Result<usize> {
        match message {
            Message::Ready => Ok(0),
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn decode(&self, _src: &mut &[u8], _version: ProtocolVersion) -> Result<Message> {
        Ok(Message::Ready)
    }
}
