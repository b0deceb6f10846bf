//! Message bodies and their per-opcode codecs.
//!
//! Each implemented opcode has a corresponding body type; [`Message`] is
//! the tagged sum over all of them. The frame header's opcode already
//! identifies the body, so codecs serialize only the body content, never a
//! variant tag.
//!
//! Only the simple handshake/authentication bodies and the event family
//! are implemented here. The remaining message types (STARTUP, OPTIONS,
//! SUPPORTED, QUERY, REGISTER, RESULT, PREPARE, EXECUTE, BATCH, ERROR) are
//! peer codecs that share the [`MessageCodec`] interface and are injected
//! through the registry by whoever implements them; frames naming them
//! fail with `UnsupportedOpcode` until then.
//!
//! Every codec implements the same triple: `encode` writes the body,
//! `encoded_length` predicts the exact byte count `encode` will produce,
//! and `decode` rebuilds the body from a cursor. The frame codec uses the
//! prediction to preallocate one buffer for the whole frame, so
//! `encode`/`encoded_length` must branch identically.
//!
//! # Invariants
//!
//! - **Opcode uniqueness**: each `Message` variant maps to exactly one
//!   [`Opcode`], reported by [`Message::opcode`].
//! - **Codec ownership**: a codec handed a variant it does not serve fails
//!   with `TypeMismatch` instead of guessing.

pub mod auth;
pub mod event;
pub mod ready;

use crate::{errors::Result, opcodes::Opcode, version::ProtocolVersion};

pub use auth::{AuthChallenge, AuthResponse, AuthSuccess, Authenticate};
pub use event::Event;

/// A fully decoded message body.
///
/// Requests and responses share the enum; [`Message::is_response`] reports
/// the direction, which drives the header's direction bit and the
/// tracing-id prefix rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// SASL token (request)
    AuthResponse(AuthResponse),
    /// Server ready (response, empty body)
    Ready,
    /// Authentication required (response)
    Authenticate(Authenticate),
    /// Server-pushed event (response)
    Event(Event),
    /// SASL challenge (response)
    AuthChallenge(AuthChallenge),
    /// Authentication success (response)
    AuthSuccess(AuthSuccess),
}

impl Message {
    /// The opcode identifying this message on the wire.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::AuthResponse(_) => Opcode::AuthResponse,
            Self::Ready => Opcode::Ready,
            Self::Authenticate(_) => Opcode::Authenticate,
            Self::Event(_) => Opcode::Event,
            Self::AuthChallenge(_) => Opcode::AuthChallenge,
            Self::AuthSuccess(_) => Opcode::AuthSuccess,
        }
    }

    /// Whether this message flows server-to-client.
    ///
    /// Responses carry the header direction bit and may carry a tracing-id
    /// prefix and warnings; requests may not.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        match self {
            Self::AuthResponse(_) => false,
            Self::Ready
            | Self::Authenticate(_)
            | Self::Event(_)
            | Self::AuthChallenge(_)
            | Self::AuthSuccess(_) => true,
        }
    }

    /// The protocol name of this message kind, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AuthResponse(_) => "AUTH_RESPONSE",
            Self::Ready => "READY",
            Self::Authenticate(_) => "AUTHENTICATE",
            Self::Event(_) => "EVENT",
            Self::AuthChallenge(_) => "AUTH_CHALLENGE",
            Self::AuthSuccess(_) => "AUTH_SUCCESS",
        }
    }
}

/// A per-opcode body codec.
///
/// The registry owns one boxed codec per opcode. The trait is object-safe:
/// destinations and sources are concrete buffer types rather than `BufMut`
/// generics.
pub trait MessageCodec: Send + Sync {
    /// The opcode this codec serves.
    fn opcode(&self) -> Opcode;

    /// Serialize the body of `message` into `dst`.
    ///
    /// # Errors
    ///
    /// Fails with `TypeMismatch` if `message` is not the variant this codec
    /// serves, or with a `VersionFeatureMismatch`/`UnknownVariant` where the
    /// body uses features the version or codec does not know.
    fn encode(&self, message: &Message, dst: &mut Vec<u8>, version: ProtocolVersion)
        -> Result<()>;

    /// Predict the exact byte count [`MessageCodec::encode`] will produce.
    ///
    /// # Errors
    ///
    /// Fails under exactly the same conditions as `encode`; the two share
    /// their branch structure.
    fn encoded_length(&self, message: &Message, version: ProtocolVersion) -> Result<usize>;

    /// Rebuild a body from `src`.
    ///
    /// # Errors
    ///
    /// Fails with `ShortRead`/`InvalidEncoding` on malformed input, or
    /// `UnknownVariant`/`VersionFeatureMismatch` on unrecognized or
    /// version-gated content.
    fn decode(&self, src: &mut &[u8], version: ProtocolVersion) -> Result<Message>;
}
