// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define NLA value trees, decode results and codec errors.
// Author: Lukas Bower
#![allow(clippy::module_name_repetitions)]

//! Value trees and error types shared by the encoder and decoder.

use serde::Serialize;
use thiserror::Error;

use crate::policy::DataType;

/// Size of the attribute header (`length:u16`, `type:u16`).
pub const NLA_HDRLEN: usize = 4;

/// Every record is padded to this boundary.
pub const NLA_ALIGNTO: usize = 4;

/// Type id bits; the two upper bits carry the nested/byte-order flags.
pub const NLA_TYPE_MASK: u16 = 0x3fff;

/// Round `len` up to the attribute alignment boundary.
#[must_use]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Value carried by a dataset entry prior to encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// Unsigned integer packed little-endian at the attribute width.
    Scalar(u64),
    /// Raw little-endian byte string, used for `Unspec` attributes.
    Bytes(Vec<u8>),
    /// Child attributes encoded with the nested policy.
    Nested(Dataset),
}

impl From<u8> for AttrValue {
    fn from(value: u8) -> Self {
        Self::Scalar(u64::from(value))
    }
}

impl From<u16> for AttrValue {
    fn from(value: u16) -> Self {
        Self::Scalar(u64::from(value))
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Scalar(u64::from(value))
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for AttrValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Dataset> for AttrValue {
    fn from(value: Dataset) -> Self {
        Self::Nested(value)
    }
}

/// Dataset entry: a value plus optional type/length overrides.
///
/// Overrides never change the emitted record; they narrow which policy entry
/// the encoder accepts for the entry's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// Value to encode.
    pub value: AttrValue,
    /// Expected type id, validated against the policy.
    pub nla_type: Option<u16>,
    /// Expected payload length, validated against the policy.
    pub nla_len: Option<u16>,
}

impl Attr {
    /// Wrap a value without overrides.
    pub fn new(value: impl Into<AttrValue>) -> Self {
        Self {
            value: value.into(),
            nla_type: None,
            nla_len: None,
        }
    }

    /// Require the matched policy entry to carry `nla_type`.
    #[must_use]
    pub fn with_type(mut self, nla_type: u16) -> Self {
        self.nla_type = Some(nla_type);
        self
    }

    /// Require the matched policy entry to declare `nla_len`.
    #[must_use]
    pub fn with_len(mut self, nla_len: u16) -> Self {
        self.nla_len = Some(nla_len);
        self
    }
}

/// Ordered name → attribute mapping handed to the encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    entries: Vec<(String, Attr)>,
}

impl Dataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`, keeping its original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> &mut Self {
        self.insert_attr(name, Attr::new(value))
    }

    /// Insert or replace `name` with an attribute carrying overrides.
    pub fn insert_attr(&mut self, name: impl Into<String>, attr: Attr) -> &mut Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = attr,
            None => self.entries.push((name, attr)),
        }
        self
    }

    /// Builder-style [`Dataset::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up an entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attr> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, attr)| attr)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attr)> {
        self.entries.iter().map(|(key, attr)| (key.as_str(), attr))
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dataset has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parsed value of a decoded attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    /// Little-endian integer of the attribute width.
    Scalar(u64),
    /// `Unspec` payload longer than eight bytes.
    Bytes(Vec<u8>),
    /// Recursively decoded child attributes.
    Nested(Decoded),
}

/// Attribute matched against the policy during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedAttribute {
    /// Policy name of the attribute.
    pub name: String,
    /// Type id observed on the wire (flag bits masked off).
    pub nla_type: u16,
    /// Data type of the matched policy entry.
    pub data_type: DataType,
    /// Payload bytes without header or padding.
    #[serde(skip)]
    pub payload: Vec<u8>,
    /// Parsed value.
    pub value: DecodedValue,
    /// Big-endian hex rendering of scalar payloads, kept for register dumps.
    pub value_raw: Option<String>,
}

impl DecodedAttribute {
    /// Payload length as observed on the wire.
    #[must_use]
    pub fn nla_len(&self) -> usize {
        self.payload.len()
    }

    /// Scalar value, if the attribute decoded to one.
    #[must_use]
    pub fn scalar(&self) -> Option<u64> {
        match self.value {
            DecodedValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Nested mapping, if the attribute is a container.
    #[must_use]
    pub fn nested(&self) -> Option<&Decoded> {
        match &self.value {
            DecodedValue::Nested(inner) => Some(inner),
            _ => None,
        }
    }
}

/// Record skipped because no policy entry matched its type id and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnmatchedAttribute {
    /// Byte offset of the record header in the decoded buffer.
    pub offset: usize,
    /// Type id observed on the wire.
    pub nla_type: u16,
    /// Payload length observed on the wire.
    pub nla_len: usize,
}

/// Ordered name → attribute mapping produced by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Decoded {
    attrs: Vec<DecodedAttribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unmatched: Vec<UnmatchedAttribute>,
}

impl Decoded {
    /// Look up an attribute by policy name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DecodedAttribute> {
        self.attrs.iter().find(|attr| attr.name == name)
    }

    /// Scalar value of `name`, if present and scalar.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(DecodedAttribute::scalar)
    }

    /// Nested mapping of `name`, if present and nested.
    #[must_use]
    pub fn nested(&self, name: &str) -> Option<&Decoded> {
        self.get(name).and_then(DecodedAttribute::nested)
    }

    /// Iterate matched attributes in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &DecodedAttribute> {
        self.attrs.iter()
    }

    /// Records skipped at this nesting level.
    #[must_use]
    pub fn unmatched(&self) -> &[UnmatchedAttribute] {
        &self.unmatched
    }

    /// Number of matched attributes at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Whether no attribute matched at this level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub(crate) fn insert(&mut self, attr: DecodedAttribute) {
        match self.attrs.iter_mut().find(|slot| slot.name == attr.name) {
            Some(slot) => *slot = attr,
            None => self.attrs.push(attr),
        }
    }

    pub(crate) fn push_unmatched(&mut self, record: UnmatchedAttribute) {
        self.unmatched.push(record);
    }
}

/// TLV framing inconsistent with the buffer being decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Fewer than four bytes remain where a header was expected.
    #[error("truncated header at offset {offset}: {remaining} bytes left")]
    TruncatedHeader {
        /// Offset of the partial header.
        offset: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },
    /// Declared record length is smaller than the header itself.
    #[error("declared length {declared} at offset {offset} is shorter than the header")]
    LengthBelowHeader {
        /// Offset of the record.
        offset: usize,
        /// Length field value.
        declared: u16,
    },
    /// Declared record length reaches past the end of the buffer.
    #[error("declared length {declared} at offset {offset} overruns a {buffer}-byte buffer")]
    Overrun {
        /// Offset of the record.
        offset: usize,
        /// Length field value.
        declared: u16,
        /// Total buffer length.
        buffer: usize,
    },
    /// Scalar payload shorter than the width implied by its data type.
    #[error("attribute {name}: {actual}-byte payload too short for a {width}-byte scalar")]
    ShortScalar {
        /// Policy name of the attribute.
        name: String,
        /// Expected scalar width.
        width: usize,
        /// Observed payload length.
        actual: usize,
    },
}

/// Errors surfaced by policy loading, encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NlaError {
    /// Buffer framing is inconsistent.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// Dataset key without a matching policy entry.
    #[error("unknown attribute {0}")]
    UnknownAttribute(String),
    /// Schema declares a data type the codec does not implement.
    #[error("attribute {name} declares unsupported data type {data_type}")]
    UnsupportedType {
        /// Attribute name.
        name: String,
        /// Data type spelling found in the schema.
        data_type: String,
    },
    /// Scalar value wider than the attribute.
    #[error("attribute {name}: value {value:#x} does not fit in {width} bytes")]
    ValueOutOfRange {
        /// Attribute name.
        name: String,
        /// Offending value.
        value: u64,
        /// Attribute width in bytes.
        width: usize,
    },
    /// Value variant incompatible with the attribute's data type.
    #[error("attribute {name}: value shape does not fit data type {expected}")]
    ShapeMismatch {
        /// Attribute name.
        name: String,
        /// Data type declared by the policy.
        expected: DataType,
    },
    /// Byte string length differs from the declared `Unspec` length.
    #[error("attribute {name}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Attribute name.
        name: String,
        /// Declared payload length.
        expected: usize,
        /// Supplied payload length.
        actual: usize,
    },
    /// Encoded record does not fit the 16-bit length field.
    #[error("attribute {name}: {len}-byte record exceeds the length field")]
    RecordTooLarge {
        /// Attribute name.
        name: String,
        /// Record length including header.
        len: usize,
    },
    /// Schema document is malformed or inconsistent.
    #[error("invalid policy schema: {0}")]
    Schema(String),
}
