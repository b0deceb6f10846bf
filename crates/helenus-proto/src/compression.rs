//! Body compression.
//!
//! The frame codec treats compression as an injected dependency: it calls
//! [`Compressor::compress`] on the fully serialized body and
//! [`Compressor::decompress`] on a received one, and never looks inside.
//! Which algorithm a connection uses is negotiated in STARTUP, which is why
//! STARTUP and OPTIONS frames are always sent uncompressed.
//!
//! Two implementations are provided, matching the algorithms servers
//! advertise: [`Lz4Compressor`] and [`SnappyCompressor`].

use bytes::{Buf, BufMut};

use crate::errors::{CodecError, Result};

/// A whole-body compression algorithm.
///
/// Implementations must be pure transformations: for every input `x`,
/// `decompress(compress(x)) == x`. They must also be safe to call from
/// multiple threads, since a single frame codec may be shared.
pub trait Compressor: Send + Sync {
    /// The algorithm name as it appears in the STARTUP `COMPRESSION`
    /// option.
    fn algorithm(&self) -> &'static str;

    /// Compress a fully serialized frame body.
    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>>;

    /// Decompress a received frame body.
    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>>;
}

/// LZ4 block compression with the 4-byte big-endian uncompressed-length
/// prefix the protocol mandates for lz4 bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn algorithm(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        if raw.len() > u32::MAX as usize {
            return Err(CodecError::Compressor(format!(
                "lz4 input of {} bytes exceeds the length prefix range",
                raw.len()
            )));
        }
        let block = lz4_flex::compress(raw);
        let mut out = Vec::with_capacity(4 + block.len());
        out.put_u32(raw.len() as u32);
        out.extend_from_slice(&block);
        Ok(out)
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        if compressed.len() < 4 {
            return Err(CodecError::Compressor(format!(
                "lz4 body of {} bytes is shorter than its length prefix",
                compressed.len()
            )));
        }
        let mut cursor = compressed;
        let uncompressed_len = cursor.get_u32() as usize;
        lz4_flex::decompress(cursor, uncompressed_len)
            .map_err(|e| CodecError::Compressor(format!("lz4 decompression failed: {e}")))
    }
}

/// Raw (unframed) snappy block compression.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnappyCompressor;

impl Compressor for SnappyCompressor {
    fn algorithm(&self) -> &'static str {
        "snappy"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Encoder::new()
            .compress_vec(raw)
            .map_err(|e| CodecError::Compressor(format!("snappy compression failed: {e}")))
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Decoder::new()
            .decompress_vec(compressed)
            .map_err(|e| CodecError::Compressor(format!("snappy decompression failed: {e}")))
    }
}
