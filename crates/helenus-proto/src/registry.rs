//! The opcode-to-codec registry.
//!
//! The frame codec never knows message layouts itself; it looks up the
//! opcode's [`MessageCodec`] here. The registry is populated at
//! construction and immutable afterwards, which is what makes a shared
//! frame codec safe to use from multiple threads.
//!
//! [`CodecRegistry::new`] registers the codecs this crate implements.
//! Peer codecs for the remaining opcodes (STARTUP, OPTIONS, SUPPORTED,
//! QUERY, REGISTER, RESULT, PREPARE, EXECUTE, BATCH, ERROR) share the same
//! interface and are added through [`CodecRegistry::builder`]; without
//! them, frames naming those opcodes fail with `UnsupportedOpcode`.

use std::collections::HashMap;
use std::fmt;

use crate::{
    errors::{CodecError, Result},
    messages::{
        auth::{AuthChallengeCodec, AuthResponseCodec, AuthSuccessCodec, AuthenticateCodec},
        event::EventCodec,
        ready::ReadyCodec,
        MessageCodec,
    },
    opcodes::Opcode,
};

/// An immutable mapping from opcode to message codec.
pub struct CodecRegistry {
    codecs: HashMap<Opcode, Box<dyn MessageCodec>>,
}

impl CodecRegistry {
    /// A registry with every codec this crate implements.
    #[must_use]
    pub fn new() -> Self {
        Self::builder()
            .register(Box::new(ReadyCodec))
            .register(Box::new(AuthenticateCodec))
            .register(Box::new(AuthResponseCodec))
            .register(Box::new(AuthChallengeCodec))
            .register(Box::new(AuthSuccessCodec))
            .register(Box::new(EventCodec))
            .build()
    }

    /// An empty builder for composing a custom codec set.
    #[must_use]
    pub fn builder() -> CodecRegistryBuilder {
        CodecRegistryBuilder { codecs: HashMap::new() }
    }

    /// Look up the codec registered for `opcode`.
    ///
    /// # Errors
    ///
    /// Fails with [`CodecError::UnsupportedOpcode`] when none is
    /// registered.
    pub fn get(&self, opcode: Opcode) -> Result<&dyn MessageCodec> {
        self.codecs
            .get(&opcode)
            .map(|codec| &**codec)
            .ok_or(CodecError::UnsupportedOpcode(opcode.to_u8()))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut opcodes: Vec<Opcode> = self.codecs.keys().copied().collect();
        opcodes.sort_by_key(|opcode| opcode.to_u8());
        f.debug_struct("CodecRegistry").field("opcodes", &opcodes).finish()
    }
}

/// Builder for a [`CodecRegistry`].
pub struct CodecRegistryBuilder {
    codecs: HashMap<Opcode, Box<dyn MessageCodec>>,
}

impl CodecRegistryBuilder {
    /// Register a codec under the opcode it reports. A later registration
    /// for the same opcode replaces the earlier one.
    #[must_use]
    pub fn register(mut self, codec: Box<dyn MessageCodec>) -> Self {
        self.codecs.insert(codec.opcode(), codec);
        self
    }

    /// Freeze the registered set.
    #[must_use]
    pub fn build(self) -> CodecRegistry {
        CodecRegistry { codecs: self.codecs }
    }
}
