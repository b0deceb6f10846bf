//! Fixed-layout readers and writers for the protocol's notation types.
//!
//! Every wire type comes as a triple: a reader that consumes from a cursor,
//! a writer that appends to a destination, and a length predictor returning
//! exactly the byte count the writer produces. Frame encoders rely on the
//! predictors to preallocate a single buffer before writing anything, so
//! predictor/writer agreement is a hard invariant and is tested for every
//! type.
//!
//! Readers verify the remaining byte count before consuming, so a failed
//! read never advances the cursor past partially consumed data. A
//! multi-field read that fails midway leaves the cursor at the failing
//! field; message decoders treat the buffer as poisoned on error and
//! discard it.
//!
//! All multi-byte integers are big-endian, per network byte order.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::{Buf, BufMut};
use uuid::Uuid;

use crate::errors::{CodecError, Result};

/// Encoded length of a `[byte]`
pub const LENGTH_OF_BYTE: usize = 1;
/// Encoded length of a `[short]`
pub const LENGTH_OF_SHORT: usize = 2;
/// Encoded length of an `[int]`
pub const LENGTH_OF_INT: usize = 4;
/// Encoded length of a `[long]`
pub const LENGTH_OF_LONG: usize = 8;
/// Encoded length of a `[uuid]`
pub const LENGTH_OF_UUID: usize = 16;

fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<()> {
    let remaining = buf.remaining();
    if remaining < needed {
        return Err(CodecError::ShortRead { needed, remaining });
    }
    Ok(())
}

fn ensure_writable(buf: &impl BufMut, needed: usize) -> Result<()> {
    let remaining = buf.remaining_mut();
    if remaining < needed {
        return Err(CodecError::ShortWrite { needed, remaining });
    }
    Ok(())
}

// Scalars

/// Read a single unsigned byte.
pub fn read_byte(buf: &mut impl Buf) -> Result<u8> {
    ensure_remaining(buf, LENGTH_OF_BYTE)?;
    Ok(buf.get_u8())
}

/// Read a 2-byte unsigned integer.
pub fn read_short(buf: &mut impl Buf) -> Result<u16> {
    ensure_remaining(buf, LENGTH_OF_SHORT)?;
    Ok(buf.get_u16())
}

/// Read a 4-byte signed integer.
pub fn read_int(buf: &mut impl Buf) -> Result<i32> {
    ensure_remaining(buf, LENGTH_OF_INT)?;
    Ok(buf.get_i32())
}

/// Read an 8-byte signed integer.
pub fn read_long(buf: &mut impl Buf) -> Result<i64> {
    ensure_remaining(buf, LENGTH_OF_LONG)?;
    Ok(buf.get_i64())
}

/// Write a single unsigned byte.
pub fn write_byte(value: u8, buf: &mut impl BufMut) -> Result<()> {
    ensure_writable(buf, LENGTH_OF_BYTE)?;
    buf.put_u8(value);
    Ok(())
}

/// Write a 2-byte unsigned integer.
pub fn write_short(value: u16, buf: &mut impl BufMut) -> Result<()> {
    ensure_writable(buf, LENGTH_OF_SHORT)?;
    buf.put_u16(value);
    Ok(())
}

/// Write a 4-byte signed integer.
pub fn write_int(value: i32, buf: &mut impl BufMut) -> Result<()> {
    ensure_writable(buf, LENGTH_OF_INT)?;
    buf.put_i32(value);
    Ok(())
}

/// Write an 8-byte signed integer.
pub fn write_long(value: i64, buf: &mut impl BufMut) -> Result<()> {
    ensure_writable(buf, LENGTH_OF_LONG)?;
    buf.put_i64(value);
    Ok(())
}

// Uuid

/// Read a `[uuid]`: 16 bytes verbatim.
pub fn read_uuid(buf: &mut impl Buf) -> Result<Uuid> {
    ensure_remaining(buf, LENGTH_OF_UUID)?;
    let mut raw = [0u8; LENGTH_OF_UUID];
    buf.copy_to_slice(&mut raw);
    Ok(Uuid::from_bytes(raw))
}

/// Write a `[uuid]`: 16 bytes verbatim.
pub fn write_uuid(uuid: &Uuid, buf: &mut impl BufMut) -> Result<()> {
    ensure_writable(buf, LENGTH_OF_UUID)?;
    buf.put_slice(uuid.as_bytes());
    Ok(())
}

// Strings

/// Read a `[string]`: short length followed by UTF-8 bytes.
pub fn read_string(buf: &mut impl Buf) -> Result<String> {
    let len = usize::from(read_short(buf)?);
    ensure_remaining(buf, len)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw)
        .map_err(|e| CodecError::InvalidEncoding(format!("string is not valid UTF-8: {e}")))
}

/// Write a `[string]`: short length followed by UTF-8 bytes.
///
/// # Errors
///
/// Fails with [`CodecError::InvalidEncoding`] if the string exceeds the
/// 65535-byte range of its length field.
pub fn write_string(value: &str, buf: &mut impl BufMut) -> Result<()> {
    let len = value.len();
    if len > usize::from(u16::MAX) {
        return Err(CodecError::InvalidEncoding(format!(
            "string of {len} bytes exceeds the [short] length range"
        )));
    }
    ensure_writable(buf, LENGTH_OF_SHORT + len)?;
    buf.put_u16(len as u16);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Predicted encoded length of a `[string]`.
#[must_use]
pub fn length_of_string(value: &str) -> usize {
    LENGTH_OF_SHORT + value.len()
}

/// Read a `[long string]`: int length followed by UTF-8 bytes.
pub fn read_long_string(buf: &mut impl Buf) -> Result<String> {
    let len = read_int(buf)?;
    if len < 0 {
        return Err(CodecError::InvalidEncoding(format!("negative long string length: {len}")));
    }
    let len = len as usize;
    ensure_remaining(buf, len)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw)
        .map_err(|e| CodecError::InvalidEncoding(format!("long string is not valid UTF-8: {e}")))
}

/// Write a `[long string]`: int length followed by UTF-8 bytes.
pub fn write_long_string(value: &str, buf: &mut impl BufMut) -> Result<()> {
    let len = value.len();
    if len > i32::MAX as usize {
        return Err(CodecError::InvalidEncoding(format!(
            "long string of {len} bytes exceeds the [int] length range"
        )));
    }
    ensure_writable(buf, LENGTH_OF_INT + len)?;
    buf.put_i32(len as i32);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Predicted encoded length of a `[long string]`.
#[must_use]
pub fn length_of_long_string(value: &str) -> usize {
    LENGTH_OF_INT + value.len()
}

// Bytes

/// Read a `[bytes]` value: int length followed by that many bytes.
///
/// A negative length encodes an absent value and yields `None`; a zero
/// length yields an empty `Some`. The two are distinct on the wire.
pub fn read_bytes(buf: &mut impl Buf) -> Result<Option<Vec<u8>>> {
    let len = read_int(buf)?;
    if len < 0 {
        return Ok(None);
    }
    let len = len as usize;
    ensure_remaining(buf, len)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    Ok(Some(raw))
}

/// Write a `[bytes]` value. `None` is written as length -1.
pub fn write_bytes(value: Option<&[u8]>, buf: &mut impl BufMut) -> Result<()> {
    match value {
        None => write_int(-1, buf),
        Some(raw) => {
            let len = raw.len();
            if len > i32::MAX as usize {
                return Err(CodecError::InvalidEncoding(format!(
                    "bytes value of {len} bytes exceeds the [int] length range"
                )));
            }
            ensure_writable(buf, LENGTH_OF_INT + len)?;
            buf.put_i32(len as i32);
            buf.put_slice(raw);
            Ok(())
        },
    }
}

/// Predicted encoded length of a `[bytes]` value.
#[must_use]
pub fn length_of_bytes(value: Option<&[u8]>) -> usize {
    LENGTH_OF_INT + value.map_or(0, <[u8]>::len)
}

// Collections

fn read_collection_len(buf: &mut impl Buf) -> Result<usize> {
    Ok(usize::from(read_short(buf)?))
}

fn check_collection_len(len: usize, what: &str) -> Result<()> {
    if len > usize::from(u16::MAX) {
        return Err(CodecError::InvalidEncoding(format!(
            "{what} of {len} entries exceeds the [short] length range"
        )));
    }
    Ok(())
}

/// Read a `[string list]`: short count followed by that many strings.
pub fn read_string_list(buf: &mut impl Buf) -> Result<Vec<String>> {
    let count = read_collection_len(buf)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read_string(buf)?);
    }
    Ok(items)
}

/// Write a `[string list]`: short count followed by that many strings.
pub fn write_string_list(items: &[String], buf: &mut impl BufMut) -> Result<()> {
    check_collection_len(items.len(), "string list")?;
    write_short(items.len() as u16, buf)?;
    for item in items {
        write_string(item, buf)?;
    }
    Ok(())
}

/// Predicted encoded length of a `[string list]`.
#[must_use]
pub fn length_of_string_list(items: &[String]) -> usize {
    LENGTH_OF_SHORT + items.iter().map(|s| length_of_string(s)).sum::<usize>()
}

/// Read a `[bytes map]`: short count followed by (string, bytes) entries.
///
/// Map values are total: a negative value length inside the map is
/// rejected, unlike the standalone nullable `[bytes]`.
pub fn read_bytes_map(buf: &mut impl Buf) -> Result<HashMap<String, Vec<u8>>> {
    let count = read_collection_len(buf)?;
    let mut map = HashMap::with_capacity(count);
    for _ in 0..count {
        let key = read_string(buf)?;
        let value = read_bytes(buf)?.ok_or_else(|| {
            CodecError::InvalidEncoding(format!("null bytes value for key {key:?} in bytes map"))
        })?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Write a `[bytes map]`: short count followed by (string, bytes) entries.
pub fn write_bytes_map(map: &HashMap<String, Vec<u8>>, buf: &mut impl BufMut) -> Result<()> {
    check_collection_len(map.len(), "bytes map")?;
    write_short(map.len() as u16, buf)?;
    for (key, value) in map {
        write_string(key, buf)?;
        write_bytes(Some(value), buf)?;
    }
    Ok(())
}

/// Predicted encoded length of a `[bytes map]`.
#[must_use]
pub fn length_of_bytes_map(map: &HashMap<String, Vec<u8>>) -> usize {
    LENGTH_OF_SHORT
        + map
            .iter()
            .map(|(key, value)| length_of_string(key) + length_of_bytes(Some(value)))
            .sum::<usize>()
}

// Inet

/// Read an `[inet]`: an address length byte (4 or 16), the address bytes,
/// and an int port.
pub fn read_inet(buf: &mut impl Buf) -> Result<SocketAddr> {
    let addr_len = read_byte(buf)?;
    let ip = match addr_len {
        4 => {
            ensure_remaining(buf, 4)?;
            let mut octets = [0u8; 4];
            buf.copy_to_slice(&mut octets);
            IpAddr::V4(Ipv4Addr::from(octets))
        },
        16 => {
            ensure_remaining(buf, 16)?;
            let mut octets = [0u8; 16];
            buf.copy_to_slice(&mut octets);
            IpAddr::V6(Ipv6Addr::from(octets))
        },
        other => {
            return Err(CodecError::InvalidEncoding(format!(
                "invalid inet address length: {other} (expected 4 or 16)"
            )));
        },
    };
    let port = read_int(buf)?;
    if !(0..=i32::from(u16::MAX)).contains(&port) {
        return Err(CodecError::InvalidEncoding(format!("inet port out of range: {port}")));
    }
    Ok(SocketAddr::new(ip, port as u16))
}

/// Write an `[inet]`: an address length byte, the address bytes, and an
/// int port.
pub fn write_inet(addr: &SocketAddr, buf: &mut impl BufMut) -> Result<()> {
    match addr.ip() {
        IpAddr::V4(ip) => {
            write_byte(4, buf)?;
            ensure_writable(buf, 4)?;
            buf.put_slice(&ip.octets());
        },
        IpAddr::V6(ip) => {
            write_byte(16, buf)?;
            ensure_writable(buf, 16)?;
            buf.put_slice(&ip.octets());
        },
    }
    write_int(i32::from(addr.port()), buf)
}

/// Predicted encoded length of an `[inet]`.
#[must_use]
pub fn length_of_inet(addr: &SocketAddr) -> usize {
    let addr_len = match addr.ip() {
        IpAddr::V4(_) => 4,
        IpAddr::V6(_) => 16,
    };
    LENGTH_OF_BYTE + addr_len + LENGTH_OF_INT
}
