//! Protocol version handling.
//!
//! The codec speaks versions 3 and 4 of the native protocol, plus the
//! version-5 wire format under negotiation ("beta"). Beta frames must carry
//! the use-beta header flag; see [`crate::flags::HeaderFlags::USE_BETA`].

use std::fmt;

/// A supported native-protocol version.
///
/// The ordering follows the wire numbering, so feature gates read as plain
/// comparisons: `version >= ProtocolVersion::V4` is "protocol v4 or later".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    /// Protocol version 3
    V3,
    /// Protocol version 4
    V4,
    /// The in-development version-5 wire format, usable only with an
    /// explicit opt-in flag bit
    V5Beta,
}

impl ProtocolVersion {
    /// All versions this codec accepts, in wire order.
    pub const SUPPORTED: &'static [Self] = &[Self::V3, Self::V4, Self::V5Beta];

    /// The version number as it appears in the low 7 bits of header byte 0.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::V3 => 3,
            Self::V4 => 4,
            Self::V5Beta => 5,
        }
    }

    /// Parse a wire version number.
    ///
    /// Returns `None` for versions outside the known set; callers reject
    /// those with [`CodecError::UnsupportedVersion`](crate::CodecError).
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            3 => Some(Self::V3),
            4 => Some(Self::V4),
            5 => Some(Self::V5Beta),
            _ => None,
        }
    }

    /// Whether this is the beta version requiring the use-beta flag.
    #[must_use]
    pub const fn is_beta(self) -> bool {
        matches!(self, Self::V5Beta)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V3 => f.write_str("3"),
            Self::V4 => f.write_str("4"),
            Self::V5Beta => f.write_str("5-beta"),
        }
    }
}
