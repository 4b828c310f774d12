//! The preference map and its on-disk message codec.
//!
//! On disk a preferences file is one top-level message whose repeated
//! field 1 holds MapEntry submessages:
//!
//! - MapEntry field 1: key, UTF-8 string, length-delimited
//! - MapEntry field 2: Value submessage, length-delimited, optional
//!
//! Any other field at either level is skipped generically, so files written
//! by a newer schema still decode.

use std::collections::BTreeMap;

use bytes::BufMut;
use tracing::{debug, trace};

use crate::error::Result;
use crate::value::{decode_value, encode_value, PreferenceValue};
use crate::wire::{
    decode_len_prefixed, decode_tag, encode_tag, encode_varint, skip_field, WireType,
};

/// Decode one MapEntry submessage slice.
///
/// Returns `None` for an entry with no usable key; such entries are dropped
/// rather than treated as errors, since a legitimate absent-value entry can
/// otherwise resemble a malformed one. An entry with a key but no value
/// field decodes to [`PreferenceValue::Absent`].
pub fn decode_entry(buf: &[u8]) -> Result<Option<(String, PreferenceValue)>> {
    let mut key: Option<String> = None;
    let mut value = PreferenceValue::Absent;

    let mut pos = 0;
    while pos < buf.len() {
        let (field_number, wire_type, next) = decode_tag(buf, pos)?;
        pos = next;

        match (field_number, wire_type) {
            (1, WireType::Len) => {
                let (payload, next) = decode_len_prefixed(buf, pos)?;
                if key.is_none() {
                    key = Some(String::from_utf8_lossy(payload).into_owned());
                }
                pos = next;
            }
            (2, WireType::Len) => {
                let (payload, next) = decode_len_prefixed(buf, pos)?;
                value = decode_value(payload)?;
                pos = next;
            }
            _ => {
                pos = skip_field(buf, pos, wire_type)?;
            }
        }
    }

    match key {
        // Keys are non-empty by invariant; an empty one is dropped like a
        // missing one.
        Some(key) if !key.is_empty() => Ok(Some((key, value))),
        _ => {
            trace!("dropping map entry without a usable key");
            Ok(None)
        }
    }
}

/// Encode one MapEntry submessage into `buf`.
///
/// Field 1 (key) is always emitted; field 2 is emitted only when the value
/// is not [`PreferenceValue::Absent`].
pub fn encode_entry(key: &str, value: &PreferenceValue, buf: &mut impl BufMut) {
    encode_tag(1, WireType::Len, buf);
    encode_varint(key.len() as u64, buf);
    buf.put_slice(key.as_bytes());

    if !value.is_absent() {
        let mut inner = Vec::new();
        encode_value(value, &mut inner);
        encode_tag(2, WireType::Len, buf);
        encode_varint(inner.len() as u64, buf);
        buf.put_slice(&inner);
    }
}

/// An in-memory preference map: unique non-empty keys to values.
///
/// Backed by a `BTreeMap`, so iteration and re-serialization order is
/// sorted by key; on-disk order is not semantically significant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceMap {
    entries: BTreeMap<String, PreferenceValue>,
}

impl PreferenceMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a whole preferences file from its bytes.
    ///
    /// Every top-level field 1 is decoded as a MapEntry; a duplicate key
    /// overwrites the earlier entry. Other top-level fields are skipped.
    /// Only structural errors (truncation, varint overflow, unsupported
    /// wire type) are fatal; otherwise a possibly-empty map is returned.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut map = Self::new();
        let mut pos = 0;

        while pos < buf.len() {
            let (field_number, wire_type, next) = decode_tag(buf, pos)?;
            pos = next;

            if field_number == 1 && wire_type == WireType::Len {
                let (payload, next) = decode_len_prefixed(buf, pos)?;
                if let Some((key, value)) = decode_entry(payload)? {
                    // Last entry wins at the map level
                    map.entries.insert(key, value);
                }
                pos = next;
            } else {
                trace!(field_number, "skipping unknown top-level field");
                pos = skip_field(buf, pos, wire_type)?;
            }
        }

        debug!("decoded {} preference entries", map.len());
        Ok(map)
    }

    /// Encode the map back to file bytes: one field-1 MapEntry block per
    /// key, in sorted key order.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (key, value) in &self.entries {
            let mut entry = Vec::new();
            encode_entry(key, value, &mut entry);
            encode_tag(1, WireType::Len, &mut buf);
            encode_varint(entry.len() as u64, &mut buf);
            buf.put_slice(&entry);
        }
        buf
    }

    /// Returns the value for a key, if present
    pub fn get(&self, key: &str) -> Option<&PreferenceValue> {
        self.entries.get(key)
    }

    /// Inserts or replaces a key's value (retyping is allowed), returning
    /// the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: PreferenceValue) -> Option<PreferenceValue> {
        let key = key.into();
        debug_assert!(!key.is_empty(), "preference keys are non-empty");
        self.entries.insert(key, value)
    }

    /// Removes a key, returning its value if it was present
    pub fn remove(&mut self, key: &str) -> Option<PreferenceValue> {
        self.entries.remove(key)
    }

    /// Returns true if the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates entries in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PreferenceValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, PreferenceValue)> for PreferenceMap {
    fn from_iter<T: IntoIterator<Item = (String, PreferenceValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
