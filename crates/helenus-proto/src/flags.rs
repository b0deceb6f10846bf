//! Frame header flags.
//!
//! The flags byte at header offset 1 announces optional frame properties:
//! body compression, tracing, a custom payload, warnings, and the beta
//! protocol opt-in. Flags are derived from the frame contents at encode time
//! and drive the parsing of the optional body prefixes at decode time.

use bitflags::bitflags;

bitflags! {
    /// Frame header flags (8 bits)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HeaderFlags: u8 {
        /// Frame body is compressed with the negotiated algorithm
        const COMPRESSED = 0x01;

        /// Tracing requested (request) or a tracing id prefix follows
        /// (response)
        const TRACING = 0x02;

        /// A custom-payload bytes-map prefix follows (protocol v4+)
        const CUSTOM_PAYLOAD = 0x04;

        /// A warnings string-list prefix follows (protocol v4+, responses)
        const WARNING = 0x08;

        /// Frame uses the beta version of the protocol
        const USE_BETA = 0x10;
    }
}

impl HeaderFlags {
    /// Create flags from the raw wire byte.
    ///
    /// Infallible: unknown bits are preserved but never consulted, so a
    /// newer peer setting reserved bits does not break decoding.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }

    /// Convert to the raw wire byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.bits()
    }
}

impl Default for HeaderFlags {
    fn default() -> Self {
        Self::empty()
    }
}
