//! # Helenus Protocol: Frame Codec
//!
//! A bidirectional, byte-exact encoder and decoder for the envelope that
//! carries every request and response of the Cassandra native wire
//! protocol, covering protocol versions 3, 4 and the version-5 beta.
//!
//! ## Protocol Design
//!
//! Every frame is a 9-byte big-endian header followed by a variable-length
//! body. The header names the protocol version and direction, a flags
//! byte, a signed 16-bit stream id, the opcode, and the body length. The
//! body opens with optional flag-gated prefixes (tracing id, custom
//! payload, warnings) and ends with the opcode's message.
//!
//! ## Implementation Notes
//!
//! - **Registry dispatch**: the frame codec knows only the envelope; the
//!   per-opcode body layouts live in [`MessageCodec`] implementations,
//!   injected through a [`CodecRegistry`] at construction.
//!
//! - **Length-first encoding**: every codec predicts its encoded length
//!   before writing, so a frame is serialized into one buffer preallocated
//!   at its final size. Predictors and writers must agree byte for byte;
//!   the tests pin that invariant for every message type.
//!
//! - **Injected compression**: body compression is a [`Compressor`] trait
//!   object. [`Lz4Compressor`] and [`SnappyCompressor`] match what servers
//!   negotiate in STARTUP; STARTUP and OPTIONS themselves always travel
//!   uncompressed.
//!
//! - **No I/O, no state**: the codec consumes and produces byte buffers
//!   and is stateless after construction. Stream-id allocation, request
//!   correlation and the authentication flow belong to the connection
//!   layer above.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod compression;
pub mod errors;
pub mod flags;
pub mod frame;
pub mod messages;
pub mod opcodes;
pub mod primitives;
pub mod registry;
pub mod version;

pub use codec::{FrameCodec, HEADER_LENGTH};
pub use compression::{Compressor, Lz4Compressor, SnappyCompressor};
pub use errors::{CodecError, Result};
pub use flags::HeaderFlags;
pub use frame::{Frame, FrameBody, FrameHeader};
pub use messages::{Message, MessageCodec};
pub use opcodes::Opcode;
pub use registry::{CodecRegistry, CodecRegistryBuilder};
pub use version::ProtocolVersion;
