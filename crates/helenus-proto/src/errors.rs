//! Error types for the frame codec.
//!
//! All errors are structured and testable. The codec never retries, never
//! swallows and never logs: every failure is propagated to the caller with
//! enough context to diagnose it. A failed encode produces no bytes; a
//! failed decode produces no frame.

use thiserror::Error;

use crate::{opcodes::Opcode, version::ProtocolVersion};

/// Errors that can occur while encoding or decoding a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Version byte outside the known set {3, 4, 5-beta}
    #[error("unsupported protocol version: {0:#04x}")]
    UnsupportedVersion(u8),

    /// No codec registered for the opcode
    #[error("unsupported opcode: {0:#04x}")]
    UnsupportedOpcode(u8),

    /// Flag bit set that the version does not permit, or a required flag
    /// absent
    #[error("invalid header flags {flags:#04x}: {reason}")]
    InvalidFlag {
        /// Raw flags byte as seen on the wire
        flags: u8,
        /// What made the combination invalid
        reason: &'static str,
    },

    /// Unrecognized event type or schema-change target
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant {
        /// Which discriminator was unrecognized (e.g. "event type")
        kind: &'static str,
        /// The value found on the wire or in the message
        value: String,
    },

    /// A feature used at a protocol version that does not support it
    #[error("{feature} not supported in protocol version {version}")]
    VersionFeatureMismatch {
        /// The gated feature (e.g. "custom payloads")
        feature: &'static str,
        /// The version that rejected it
        version: ProtocolVersion,
    },

    /// Buffer exhausted before the declared element length
    #[error("short read: need {needed} bytes, {remaining} remaining")]
    ShortRead {
        /// Bytes the reader needed
        needed: usize,
        /// Bytes actually available
        remaining: usize,
    },

    /// Destination buffer too small for the bytes to be written
    #[error("short write: need {needed} bytes, {remaining} remaining")]
    ShortWrite {
        /// Bytes the writer needed
        needed: usize,
        /// Capacity actually available
        remaining: usize,
    },

    /// Malformed primitive: negative length where unsigned is required,
    /// invalid inet length byte, non-UTF-8 string data, out-of-range value
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Underlying compressor failure, or a compressed frame with no
    /// compressor configured
    #[error("compressor failure: {0}")]
    Compressor(String),

    /// The message handed to a codec does not match the opcode it serves
    #[error("message does not match opcode {expected:?}: got {actual}")]
    TypeMismatch {
        /// Opcode the codec serves
        expected: Opcode,
        /// Kind of message actually received
        actual: &'static str,
    },
}

/// Convenient Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;
