//! Authentication handshake messages.
//!
//! After STARTUP, a server requiring authentication answers AUTHENTICATE
//! with the authenticator class name; the client then sends AUTH_RESPONSE
//! tokens, the server replies with AUTH_CHALLENGE until satisfied, and
//! finishes with AUTH_SUCCESS. All token bodies are a single nullable
//! `[bytes]` value.
//!
//! The `Debug` impls redact token bytes so credentials never reach logs.

use std::fmt;

use crate::{
    errors::{CodecError, Result},
    messages::{Message, MessageCodec},
    opcodes::Opcode,
    primitives,
    version::ProtocolVersion,
};

fn redact(token: &Option<Vec<u8>>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match token {
        None => f.write_str("None"),
        Some(raw) => write!(f, "<redacted {} bytes>", raw.len()),
    }
}

/// Server demand for authentication (response).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticate {
    /// Fully qualified name of the authenticator class to satisfy
    pub authenticator: String,
}

/// Client SASL token (request).
#[derive(Clone, PartialEq, Eq)]
pub struct AuthResponse {
    /// Opaque SASL token; `None` and empty are distinct on the wire
    pub token: Option<Vec<u8>>,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthResponse { token: ")?;
        redact(&self.token, f)?;
        f.write_str(" }")
    }
}

/// Server SASL challenge (response).
#[derive(Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Opaque SASL challenge token
    pub token: Option<Vec<u8>>,
}

impl fmt::Debug for AuthChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthChallenge { token: ")?;
        redact(&self.token, f)?;
        f.write_str(" }")
    }
}

/// Successful authentication (response).
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    /// Final SASL token, if the mechanism produces one
    pub token: Option<Vec<u8>>,
}

impl fmt::Debug for AuthSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthSuccess { token: ")?;
        redact(&self.token, f)?;
        f.write_str(" }")
    }
}

/// Codec for AUTHENTICATE: a single `[string]`.
pub struct AuthenticateCodec;

impl MessageCodec for AuthenticateCodec {
    fn opcode(&self) -> Opcode {
        Opcode::Authenticate
    }

    fn encode(
        &self,
        message: &Message,
        dst: &mut Vec<u8>,
        _version: ProtocolVersion,
    ) -> Result<()> {
        match message {
            Message::Authenticate(authenticate) => {
                primitives::write_string(&authenticate.authenticator, dst)
            },
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn encoded_length(&self, message: &Message, _version: ProtocolVersion) -> Result<usize> {
        match message {
            Message::Authenticate(authenticate) => {
                Ok(primitives::length_of_string(&authenticate.authenticator))
            },
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn decode(&self, src: &mut &[u8], _version: ProtocolVersion) -> Result<Message> {
        let authenticator = primitives::read_string(src)?;
        Ok(Message::Authenticate(Authenticate { authenticator }))
    }
}

/// Codec for AUTH_RESPONSE: a single nullable `[bytes]`.
pub struct AuthResponseCodec;

impl MessageCodec for AuthResponseCodec {
    fn opcode(&self) -> Opcode {
        Opcode::AuthResponse
    }

    fn encode(
        &self,
        message: &Message,
        dst: &mut Vec<u8>,
        _version: ProtocolVersion,
    ) -> Result<()> {
        match message {
            Message::AuthResponse(response) => {
                primitives::write_bytes(response.token.as_deref(), dst)
            },
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn encoded_length(&self, message: &Message, _version: ProtocolVersion) -> Result<usize> {
        match message {
            Message::AuthResponse(response) => {
                Ok(primitives::length_of_bytes(response.token.as_deref()))
            },
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn decode(&self, src: &mut &[u8], _version: ProtocolVersion) -> Result<Message> {
        let token = primitives::read_bytes(src)?;
        Ok(Message::AuthResponse(AuthResponse { token }))
    }
}

/// Codec for AUTH_CHALLENGE: a single nullable `[bytes]`.
pub struct AuthChallengeCodec;

impl MessageCodec for AuthChallengeCodec {
    fn opcode(&self) -> Opcode {
        Opcode::AuthChallenge
    }

    fn encode(
        &self,
        message: &Message,
        dst: &mut Vec<u8>,
        _version: ProtocolVersion,
    ) -> Result<()> {
        match message {
            Message::AuthChallenge(challenge) => {
                primitives::write_bytes(challenge.token.as_deref(), dst)
            },
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn encoded_length(&self, message: &Message, _version: ProtocolVersion) -> Result<usize> {
        match message {
            Message::AuthChallenge(challenge) => {
                Ok(primitives::length_of_bytes(challenge.token.as_deref()))
            },
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn decode(&self, src: &mut &[u8], _version: ProtocolVersion) -> Result<Message> {
        let token = primitives::read_bytes(src)?;
        Ok(Message::AuthChallenge(AuthChallenge { token }))
    }
}

/// Codec for AUTH_SUCCESS: a single nullable `[bytes]`.
pub struct AuthSuccessCodec;

impl MessageCodec for AuthSuccessCodec {
    fn opcode(&self) -> Opcode {
        Opcode::AuthSuccess
    }

    fn encode(
        &self,
        message: &Message,
        dst: &mut Vec<u8>,
        _version: ProtocolVersion,
    ) -> Result<()> {
        match message {
            Message::AuthSuccess(success) => primitives::write_bytes(success.token.as_deref(), dst),
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn encoded_length(&self, message: &Message, _version: ProtocolVersion) -> Result<usize> {
        match message {
            Message::AuthSuccess(success) => {
                Ok(primitives::length_of_bytes(success.token.as_deref()))
            },
            other => {
                Err(CodecError::TypeMismatch { expected: self.opcode(), actual: other.kind() })
            },
        }
    }

    fn decode(&self, src: &mut &[u8], _version: ProtocolVersion) -> Result<Message> {
        let token = primitives::read_bytes(src)?;
        Ok(Message::AuthSuccess(AuthSuccess { token }))
    }
}
