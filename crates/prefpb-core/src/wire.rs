//! Low-level protobuf wire format primitives.
//!
//! This module implements the subset of the protobuf wire format needed to
//! decode and encode `.preferences_pb` files byte-compatibly.
//!
//! ## Wire Format Overview
//!
//! Each field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (bool, int32, int64)
//! - 1: I64 (fixed64, double)
//! - 2: LEN (strings, embedded messages)
//! - 5: I32 (fixed32, float)
//!
//! The deprecated group wire types (3 and 4) never appear in this format and
//! are rejected as unsupported.

use bytes::BufMut;

use crate::error::{Error, Result};

/// Protobuf wire types supported by the preferences format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, embedded messages)
    Len = 2,
    /// 32-bit fixed-width
    I32 = 5,
}

impl WireType {
    /// Decodes the low three bits of a tag, rejecting the four unsupported
    /// wire type values. `offset` is only used for error reporting.
    pub fn from_tag_bits(bits: u8, offset: usize) -> Result<Self> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            5 => Ok(WireType::I32),
            other => Err(Error::unsupported_wire_type(offset, other)),
        }
    }
}

/// Maximum encoded size of a 64-bit varint
pub const MAX_VARINT_LEN: usize = 10;

/// Decode a varint starting at `pos`.
///
/// Returns the decoded value and the position just past the last byte
/// consumed. 7-bit groups are accumulated least-significant first; a clear
/// high bit terminates the varint.
pub fn decode_varint(buf: &[u8], pos: usize) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in buf[pos.min(buf.len())..].iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(Error::varint_overflow(pos));
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, pos + i + 1));
        }
    }

    Err(Error::truncated(buf.len()))
}

/// Encode a varint into `buf`.
///
/// Callers holding a signed value must reinterpret it as unsigned 64-bit
/// two's complement first (`v as u64` after sign extension to i64).
pub fn encode_varint(mut value: u64, buf: &mut impl BufMut) {
    loop {
        if value < 0x80 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
}

/// Decode a little-endian fixed 32-bit value starting at `pos`.
pub fn decode_fixed32(buf: &[u8], pos: usize) -> Result<(u32, usize)> {
    let end = pos.checked_add(4).filter(|&e| e <= buf.len());
    let Some(end) = end else {
        return Err(Error::truncated(buf.len()));
    };
    let raw = u32::from_le_bytes(buf[pos..end].try_into().expect("4-byte slice"));
    Ok((raw, end))
}

/// Decode a little-endian fixed 64-bit value starting at `pos`.
pub fn decode_fixed64(buf: &[u8], pos: usize) -> Result<(u64, usize)> {
    let end = pos.checked_add(8).filter(|&e| e <= buf.len());
    let Some(end) = end else {
        return Err(Error::truncated(buf.len()));
    };
    let raw = u64::from_le_bytes(buf[pos..end].try_into().expect("8-byte slice"));
    Ok((raw, end))
}

/// Encode a little-endian fixed 32-bit value into `buf`.
pub fn encode_fixed32(value: u32, buf: &mut impl BufMut) {
    buf.put_u32_le(value);
}

/// Encode a little-endian fixed 64-bit value into `buf`.
pub fn encode_fixed64(value: u64, buf: &mut impl BufMut) {
    buf.put_u64_le(value);
}

/// Decode a field tag starting at `pos`.
///
/// Returns the field number, the wire type, and the position just past the
/// tag.
pub fn decode_tag(buf: &[u8], pos: usize) -> Result<(u32, WireType, usize)> {
    let (tag, next) = decode_varint(buf, pos)?;
    let wire_type = WireType::from_tag_bits((tag & 0x07) as u8, pos)?;
    Ok(((tag >> 3) as u32, wire_type, next))
}

/// Encode a field tag into `buf`.
pub fn encode_tag(field_number: u32, wire_type: WireType, buf: &mut impl BufMut) {
    encode_varint(((field_number as u64) << 3) | wire_type as u64, buf);
}

/// Decode a length-delimited payload starting at `pos`.
///
/// Reads the length varint, then returns a bounds-checked sub-slice and the
/// position just past the payload. A length that overruns the buffer is a
/// truncation error, never an out-of-bounds access.
pub fn decode_len_prefixed(buf: &[u8], pos: usize) -> Result<(&[u8], usize)> {
    let (length, data_start) = decode_varint(buf, pos)?;
    let end = usize::try_from(length)
        .ok()
        .and_then(|len| data_start.checked_add(len))
        .filter(|&e| e <= buf.len());
    let Some(end) = end else {
        return Err(Error::truncated(buf.len()));
    };
    Ok((&buf[data_start..end], end))
}

/// Skip one field's payload given its wire type, returning the position just
/// past it.
///
/// This is the single generic-skip routine shared by every nesting level
/// (top-level message, map entry, string set), so unknown fields are
/// tolerated identically everywhere.
pub fn skip_field(buf: &[u8], pos: usize, wire_type: WireType) -> Result<usize> {
    match wire_type {
        WireType::Varint => decode_varint(buf, pos).map(|(_, next)| next),
        WireType::I64 => decode_fixed64(buf, pos).map(|(_, next)| next),
        WireType::Len => decode_len_prefixed(buf, pos).map(|(_, next)| next),
        WireType::I32 => decode_fixed32(buf, pos).map(|(_, next)| next),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_varint_single_byte() {
        let data = [0x08];
        let (value, next) = decode_varint(&data, 0).unwrap();
        assert_eq!(value, 8);
        assert_eq!(next, 1);
    }

    #[test]
    fn test_decode_varint_multi_byte() {
        let data = [0xAC, 0x02]; // 300
        let (value, next) = decode_varint(&data, 0).unwrap();
        assert_eq!(value, 300);
        assert_eq!(next, 2);
    }

    #[test]
    fn test_decode_varint_max() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let (value, next) = decode_varint(&data, 0).unwrap();
        assert_eq!(value, u64::MAX);
        assert_eq!(next, 10);
    }

    #[test]
    fn test_decode_varint_at_offset() {
        let data = [0x00, 0x00, 0x96, 0x01];
        let (value, next) = decode_varint(&data, 2).unwrap();
        assert_eq!(value, 150);
        assert_eq!(next, 4);
    }

    #[test]
    fn test_decode_varint_truncated() {
        // Continuation bit set on the last byte
        let data = [0xFF, 0xFF];
        assert!(matches!(
            decode_varint(&data, 0),
            Err(Error::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_decode_varint_overflow() {
        // 11 continuation bytes with no terminator
        let data = [0x80u8; 11];
        assert!(matches!(
            decode_varint(&data, 0),
            Err(Error::VarintOverflow { offset: 0 })
        ));
    }

    #[test]
    fn test_encode_varint_zero_is_one_byte() {
        let mut buf = Vec::new();
        encode_varint(0, &mut buf);
        assert_eq!(buf, [0x00]);
    }

    #[test]
    fn test_encode_varint_max_is_ten_bytes() {
        let mut buf = Vec::new();
        encode_varint(u64::MAX, &mut buf);
        assert_eq!(buf.len(), 10);
        for &b in &buf[..9] {
            assert_ne!(b & 0x80, 0);
        }
        assert_eq!(buf[9] & 0x80, 0);
    }

    #[test]
    fn test_varint_round_trip() {
        for value in [0u64, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            let (decoded, next) = decode_varint(&buf, 0).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(next, buf.len());
        }
    }

    #[test]
    fn test_fixed32_round_trip() {
        let mut buf = Vec::new();
        encode_fixed32(0xDEAD_BEEF, &mut buf);
        assert_eq!(buf, [0xEF, 0xBE, 0xAD, 0xDE]);
        let (value, next) = decode_fixed32(&buf, 0).unwrap();
        assert_eq!(value, 0xDEAD_BEEF);
        assert_eq!(next, 4);
    }

    #[test]
    fn test_fixed64_round_trip() {
        let mut buf = Vec::new();
        encode_fixed64(0x0102_0304_0506_0708, &mut buf);
        assert_eq!(buf, [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        let (value, next) = decode_fixed64(&buf, 0).unwrap();
        assert_eq!(value, 0x0102_0304_0506_0708);
        assert_eq!(next, 8);
    }

    #[test]
    fn test_fixed_truncated() {
        assert!(matches!(
            decode_fixed32(&[0x01, 0x02, 0x03], 0),
            Err(Error::TruncatedData { .. })
        ));
        assert!(matches!(
            decode_fixed64(&[0x01; 7], 0),
            Err(Error::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_decode_tag() {
        // Field 1, wire type 2: (1 << 3) | 2 = 0x0A
        let (field, wire_type, next) = decode_tag(&[0x0A], 0).unwrap();
        assert_eq!(field, 1);
        assert_eq!(wire_type, WireType::Len);
        assert_eq!(next, 1);
    }

    #[test]
    fn test_encode_tag() {
        let mut buf = Vec::new();
        encode_tag(7, WireType::I64, &mut buf);
        assert_eq!(buf, [0x39]);
    }

    #[test]
    fn test_unsupported_wire_types_rejected() {
        // Wire types 3 and 4 (groups) plus 6 and 7
        for bits in [3u8, 4, 6, 7] {
            let tag = bits; // field 0, but the wire type check fires first
            assert!(matches!(
                decode_tag(&[tag], 0),
                Err(Error::UnsupportedWireType { wire_type, .. }) if wire_type == bits
            ));
        }
    }

    #[test]
    fn test_decode_len_prefixed() {
        let data = [0x05, b'h', b'e', b'l', b'l', b'o'];
        let (payload, next) = decode_len_prefixed(&data, 0).unwrap();
        assert_eq!(payload, b"hello");
        assert_eq!(next, 6);
    }

    #[test]
    fn test_decode_len_prefixed_overrun() {
        // Declared length 5, only 2 payload bytes present
        let data = [0x05, b'h', b'i'];
        assert!(matches!(
            decode_len_prefixed(&data, 0),
            Err(Error::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_decode_len_prefixed_huge_length() {
        // Corrupted length varint far beyond the buffer must not panic
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 0x00];
        assert!(matches!(
            decode_len_prefixed(&data, 0),
            Err(Error::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_skip_field_each_kind() {
        let varint = [0x96, 0x01, 0xAA];
        assert_eq!(skip_field(&varint, 0, WireType::Varint).unwrap(), 2);

        let i64 = [0u8; 9];
        assert_eq!(skip_field(&i64, 0, WireType::I64).unwrap(), 8);

        let len = [0x03, 1, 2, 3, 0xAA];
        assert_eq!(skip_field(&len, 0, WireType::Len).unwrap(), 4);

        let i32 = [0u8; 5];
        assert_eq!(skip_field(&i32, 0, WireType::I32).unwrap(), 4);
    }
}
