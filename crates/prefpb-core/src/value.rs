//! The preference value oneof and its codec.
//!
//! A `Value` submessage carries exactly one of seven scalar/collection
//! fields. Decoding scans every field in the slice; encoding emits exactly
//! the one field matching the variant.
//!
//! | field # | wire type | variant   |
//! |---------|-----------|-----------|
//! | 1       | VARINT    | Boolean   |
//! | 2       | I32       | Float     |
//! | 3       | VARINT    | Integer   |
//! | 4       | VARINT    | Long      |
//! | 5       | LEN       | String    |
//! | 6       | LEN       | StringSet |
//! | 7       | I64       | Double    |

use bytes::BufMut;
use tracing::warn;

use crate::error::Result;
use crate::wire::{
    decode_fixed32, decode_fixed64, decode_len_prefixed, decode_tag, decode_varint,
    encode_fixed32, encode_fixed64, encode_tag, encode_varint, skip_field, WireType,
};

/// One preference value, or the absence of one.
///
/// `StringSet` preserves element order and duplicates exactly as found on
/// disk. `Absent` models an entry whose key exists with no value payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceValue {
    /// A boolean flag
    Boolean(bool),
    /// A 32-bit IEEE754 float
    Float(f32),
    /// A 32-bit signed integer
    Integer(i32),
    /// A 64-bit signed integer
    Long(i64),
    /// UTF-8 text
    String(String),
    /// An ordered sequence of UTF-8 strings
    StringSet(Vec<String>),
    /// A 64-bit IEEE754 double
    Double(f64),
    /// Key present, value payload missing
    Absent,
}

impl PreferenceValue {
    /// Returns a short human-readable name for the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Float(_) => "float",
            Self::Integer(_) => "integer",
            Self::Long(_) => "long",
            Self::String(_) => "string",
            Self::StringSet(_) => "string set",
            Self::Double(_) => "double",
            Self::Absent => "absent",
        }
    }

    /// Returns true if no value payload is present
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl std::fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::StringSet(v) => {
                write!(f, "{{")?;
                for (i, s) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{s:?}")?;
                }
                write!(f, "}}")
            }
            Self::Double(v) => write!(f, "{v}"),
            Self::Absent => write!(f, "<absent>"),
        }
    }
}

/// Convert length-delimited bytes to a string, substituting replacement
/// characters for invalid sequences. Invalid UTF-8 is never fatal.
fn lossy_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            warn!("invalid UTF-8 in string payload; substituting replacement characters");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Decode the nested StringSet submessage: repeated field 1 strings in
/// encounter order; any other field is skipped generically.
fn decode_string_set(buf: &[u8]) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut pos = 0;

    while pos < buf.len() {
        let (field_number, wire_type, next) = decode_tag(buf, pos)?;
        pos = next;

        if field_number == 1 && wire_type == WireType::Len {
            let (payload, next) = decode_len_prefixed(buf, pos)?;
            strings.push(lossy_string(payload));
            pos = next;
        } else {
            pos = skip_field(buf, pos, wire_type)?;
        }
    }

    Ok(strings)
}

fn encode_string_set(strings: &[String], buf: &mut impl BufMut) {
    for s in strings {
        encode_tag(1, WireType::Len, buf);
        encode_varint(s.len() as u64, buf);
        buf.put_slice(s.as_bytes());
    }
}

/// Decode a Value submessage slice into a [`PreferenceValue`].
///
/// Unknown fields are skipped. A well-formed message carries exactly one
/// known field; if a malformed one carries several, the first populated
/// variant in the fixed priority order Boolean, Float, Integer, Long,
/// String, StringSet, Double is returned (never last-wins). For a repeated
/// occurrence of the same field number the first occurrence wins. With no
/// known field present the result is [`PreferenceValue::Absent`].
pub fn decode_value(buf: &[u8]) -> Result<PreferenceValue> {
    let mut boolean: Option<bool> = None;
    let mut float: Option<f32> = None;
    let mut integer: Option<i32> = None;
    let mut long: Option<i64> = None;
    let mut string: Option<String> = None;
    let mut string_set: Option<Vec<String>> = None;
    let mut double: Option<f64> = None;

    let mut pos = 0;
    while pos < buf.len() {
        let (field_number, wire_type, next) = decode_tag(buf, pos)?;
        pos = next;

        match (field_number, wire_type) {
            (1, WireType::Varint) => {
                let (raw, next) = decode_varint(buf, pos)?;
                boolean.get_or_insert(raw != 0);
                pos = next;
            }
            (2, WireType::I32) => {
                let (raw, next) = decode_fixed32(buf, pos)?;
                float.get_or_insert(f32::from_bits(raw));
                pos = next;
            }
            (3, WireType::Varint) => {
                let (raw, next) = decode_varint(buf, pos)?;
                // Truncate to 32-bit two's complement
                integer.get_or_insert(raw as u32 as i32);
                pos = next;
            }
            (4, WireType::Varint) => {
                let (raw, next) = decode_varint(buf, pos)?;
                long.get_or_insert(raw as i64);
                pos = next;
            }
            (5, WireType::Len) => {
                let (payload, next) = decode_len_prefixed(buf, pos)?;
                if string.is_none() {
                    string = Some(lossy_string(payload));
                }
                pos = next;
            }
            (6, WireType::Len) => {
                let (payload, next) = decode_len_prefixed(buf, pos)?;
                if string_set.is_none() {
                    string_set = Some(decode_string_set(payload)?);
                }
                pos = next;
            }
            (7, WireType::I64) => {
                let (raw, next) = decode_fixed64(buf, pos)?;
                double.get_or_insert(f64::from_bits(raw));
                pos = next;
            }
            _ => {
                pos = skip_field(buf, pos, wire_type)?;
            }
        }
    }

    // Fixed priority order for malformed multi-field messages
    Ok(if let Some(v) = boolean {
        PreferenceValue::Boolean(v)
    } else if let Some(v) = float {
        PreferenceValue::Float(v)
    } else if let Some(v) = integer {
        PreferenceValue::Integer(v)
    } else if let Some(v) = long {
        PreferenceValue::Long(v)
    } else if let Some(v) = string {
        PreferenceValue::String(v)
    } else if let Some(v) = string_set {
        PreferenceValue::StringSet(v)
    } else if let Some(v) = double {
        PreferenceValue::Double(v)
    } else {
        PreferenceValue::Absent
    })
}

/// Encode a [`PreferenceValue`] as a Value submessage into `buf`.
///
/// Exactly one field is emitted per the oneof table; `Absent` emits nothing.
pub fn encode_value(value: &PreferenceValue, buf: &mut impl BufMut) {
    match value {
        PreferenceValue::Boolean(v) => {
            encode_tag(1, WireType::Varint, buf);
            encode_varint(u64::from(*v), buf);
        }
        PreferenceValue::Float(v) => {
            encode_tag(2, WireType::I32, buf);
            encode_fixed32(v.to_bits(), buf);
        }
        PreferenceValue::Integer(v) => {
            encode_tag(3, WireType::Varint, buf);
            // Sign-extend to 64 bits, then reinterpret as unsigned
            encode_varint(*v as i64 as u64, buf);
        }
        PreferenceValue::Long(v) => {
            encode_tag(4, WireType::Varint, buf);
            encode_varint(*v as u64, buf);
        }
        PreferenceValue::String(v) => {
            encode_tag(5, WireType::Len, buf);
            encode_varint(v.len() as u64, buf);
            buf.put_slice(v.as_bytes());
        }
        PreferenceValue::StringSet(v) => {
            let mut inner = Vec::new();
            encode_string_set(v, &mut inner);
            encode_tag(6, WireType::Len, buf);
            encode_varint(inner.len() as u64, buf);
            buf.put_slice(&inner);
        }
        PreferenceValue::Double(v) => {
            encode_tag(7, WireType::I64, buf);
            encode_fixed64(v.to_bits(), buf);
        }
        PreferenceValue::Absent => {}
    }
}

/// Encode a [`PreferenceValue`] into a fresh byte vector.
pub fn encode_value_to_vec(value: &PreferenceValue) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value(value, &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn round_trip(value: PreferenceValue, expected_bytes: &[u8]) {
        let encoded = encode_value_to_vec(&value);
        assert_eq!(encoded, expected_bytes);
        assert_eq!(decode_value(&encoded).unwrap(), value);
    }

    #[test]
    fn test_boolean_fixture() {
        round_trip(PreferenceValue::Boolean(true), &[0x08, 0x01]);
        round_trip(PreferenceValue::Boolean(false), &[0x08, 0x00]);
    }

    #[test]
    fn test_boolean_nonzero_is_true() {
        assert_eq!(
            decode_value(&[0x08, 0x2A]).unwrap(),
            PreferenceValue::Boolean(true)
        );
    }

    #[test]
    fn test_float_fixture() {
        // 1.5f32 = 0x3FC00000, little-endian
        round_trip(
            PreferenceValue::Float(1.5),
            &[0x15, 0x00, 0x00, 0xC0, 0x3F],
        );
    }

    #[test]
    fn test_integer_fixture() {
        round_trip(PreferenceValue::Integer(150), &[0x18, 0x96, 0x01]);
    }

    #[test]
    fn test_integer_negative_sign_extends() {
        // -1 sign-extends to the full 10-byte varint
        round_trip(
            PreferenceValue::Integer(-1),
            &[
                0x18, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01,
            ],
        );
    }

    #[test]
    fn test_int32_sign_boundary() {
        // varint 0x7fffffff -> +2147483647
        let positive = [0x18, 0xFF, 0xFF, 0xFF, 0xFF, 0x07];
        assert_eq!(
            decode_value(&positive).unwrap(),
            PreferenceValue::Integer(2_147_483_647)
        );

        // varint 0x80000000 -> -2147483648 (two's complement reinterpretation)
        let negative = [0x18, 0x80, 0x80, 0x80, 0x80, 0x08];
        assert_eq!(
            decode_value(&negative).unwrap(),
            PreferenceValue::Integer(-2_147_483_648)
        );
    }

    #[test]
    fn test_long_fixture() {
        round_trip(PreferenceValue::Long(300), &[0x20, 0xAC, 0x02]);
        round_trip(PreferenceValue::Long(-2), &[
            0x20, 0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01,
        ]);
    }

    #[test]
    fn test_string_fixture() {
        round_trip(
            PreferenceValue::String("hi".to_string()),
            &[0x2A, 0x02, b'h', b'i'],
        );
    }

    #[test]
    fn test_string_invalid_utf8_is_replaced() {
        // 0xFF is never valid UTF-8; never fatal
        let data = [0x2A, 0x03, b'a', 0xFF, b'b'];
        let value = decode_value(&data).unwrap();
        assert_eq!(
            value,
            PreferenceValue::String("a\u{FFFD}b".to_string())
        );
    }

    #[test]
    fn test_string_set_fixture() {
        // ["a", "b", "a"]: order and duplicates preserved
        round_trip(
            PreferenceValue::StringSet(vec![
                "a".to_string(),
                "b".to_string(),
                "a".to_string(),
            ]),
            &[
                0x32, 0x09, // field 6, 9-byte submessage
                0x0A, 0x01, b'a', 0x0A, 0x01, b'b', 0x0A, 0x01, b'a',
            ],
        );
    }

    #[test]
    fn test_string_set_empty() {
        round_trip(PreferenceValue::StringSet(vec![]), &[0x32, 0x00]);
    }

    #[test]
    fn test_string_set_skips_unknown_nested_fields() {
        // Field 2 varint inside the set submessage is skipped
        let data = [0x32, 0x05, 0x10, 0x07, 0x0A, 0x01, b'x'];
        assert_eq!(
            decode_value(&data).unwrap(),
            PreferenceValue::StringSet(vec!["x".to_string()])
        );
    }

    #[test]
    fn test_double_fixture() {
        // 1.5f64 = 0x3FF8000000000000, little-endian
        round_trip(
            PreferenceValue::Double(1.5),
            &[0x39, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF8, 0x3F],
        );
    }

    #[test]
    fn test_empty_slice_is_absent() {
        assert_eq!(decode_value(&[]).unwrap(), PreferenceValue::Absent);
        assert!(encode_value_to_vec(&PreferenceValue::Absent).is_empty());
    }

    #[test]
    fn test_unknown_fields_only_is_absent() {
        // Field 9 varint, field 10 length-delimited
        let data = [0x48, 0x05, 0x52, 0x02, 0x01, 0x02];
        assert_eq!(decode_value(&data).unwrap(), PreferenceValue::Absent);
    }

    #[test]
    fn test_first_known_field_wins_by_priority() {
        // String (field 5) appears before Boolean (field 1) on the wire,
        // but Boolean has higher priority.
        let data = [0x2A, 0x02, b'h', b'i', 0x08, 0x01];
        assert_eq!(
            decode_value(&data).unwrap(),
            PreferenceValue::Boolean(true)
        );
    }

    #[test]
    fn test_repeated_field_first_occurrence_wins() {
        let data = [0x18, 0x05, 0x18, 0x09];
        assert_eq!(
            decode_value(&data).unwrap(),
            PreferenceValue::Integer(5)
        );
    }

    #[test]
    fn test_known_field_number_with_wrong_wire_type_is_skipped() {
        // Field 1 carried as length-delimited is not the boolean field
        let data = [0x0A, 0x01, 0x01, 0x18, 0x2A];
        assert_eq!(
            decode_value(&data).unwrap(),
            PreferenceValue::Integer(42)
        );
    }

    #[test]
    fn test_truncated_payload_is_fatal() {
        // Declared 4-byte string, 1 byte present
        let data = [0x2A, 0x04, b'x'];
        assert!(matches!(
            decode_value(&data),
            Err(Error::TruncatedData { .. })
        ));

        // Fixed64 with 3 bytes present
        let data = [0x39, 0x01, 0x02, 0x03];
        assert!(matches!(
            decode_value(&data),
            Err(Error::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_group_wire_type_is_unsupported() {
        // Field 1, wire type 3 (start group)
        let data = [0x0B];
        assert!(matches!(
            decode_value(&data),
            Err(Error::UnsupportedWireType { wire_type: 3, .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(PreferenceValue::Boolean(true).to_string(), "true");
        assert_eq!(
            PreferenceValue::StringSet(vec!["a".into(), "b".into()]).to_string(),
            "{\"a\", \"b\"}"
        );
        assert_eq!(PreferenceValue::Absent.to_string(), "<absent>");
    }
}
