// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load and validate declarative NLA attribute policies.
// Author: Lukas Bower

//! Attribute policies: the schema that drives encoding and decoding.
//!
//! Schema documents are JSON arrays of [`SchemaEntry`] objects. Loading
//! resolves every `data_type` spelling into an [`AttrKind`] once, so the
//! codec never dispatches on strings at runtime.

use core::fmt;
use std::collections::HashSet;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::types::NlaError;

/// Primitive kind of an attribute, without its nested policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// One-byte unsigned integer.
    #[serde(rename = "U8", alias = "NLA_U8")]
    U8,
    /// Two-byte unsigned integer.
    #[serde(rename = "U16", alias = "NLA_U16")]
    U16,
    /// Four-byte unsigned integer.
    #[serde(rename = "U32", alias = "NLA_U32")]
    U32,
    /// Eight-byte unsigned integer.
    #[serde(rename = "U64", alias = "NLA_U64")]
    U64,
    /// Container of child attributes.
    #[serde(rename = "NESTED", alias = "NLA_NESTED")]
    Nested,
    /// Opaque byte string of fixed length.
    #[serde(rename = "UNSPEC", alias = "NLA_UNSPEC")]
    Unspec,
}

impl DataType {
    /// Parse a schema spelling (`U32`, `NLA_U32`, ...).
    #[must_use]
    pub fn parse(spelling: &str) -> Option<Self> {
        let bare = spelling.strip_prefix("NLA_").unwrap_or(spelling);
        Some(match bare {
            "U8" => Self::U8,
            "U16" => Self::U16,
            "U32" => Self::U32,
            "U64" => Self::U64,
            "NESTED" => Self::Nested,
            "UNSPEC" => Self::Unspec,
            _ => return None,
        })
    }

    /// Width in bytes for the scalar kinds.
    #[must_use]
    pub fn scalar_width(self) -> Option<usize> {
        match self {
            Self::U8 => Some(1),
            Self::U16 => Some(2),
            Self::U32 => Some(4),
            Self::U64 => Some(8),
            Self::Nested | Self::Unspec => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::U8 => "U8",
            Self::U16 => "U16",
            Self::U32 => "U32",
            Self::U64 => "U64",
            Self::Nested => "NESTED",
            Self::Unspec => "UNSPEC",
        };
        f.write_str(label)
    }
}

/// Resolved attribute kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrKind {
    /// One-byte unsigned integer.
    U8,
    /// Two-byte unsigned integer.
    U16,
    /// Four-byte unsigned integer.
    U32,
    /// Eight-byte unsigned integer.
    U64,
    /// Container decoded with the child policy.
    Nested(Policy),
    /// Opaque byte string of the given length.
    Unspec(u16),
}

impl AttrKind {
    /// Plain data type tag.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::U8 => DataType::U8,
            Self::U16 => DataType::U16,
            Self::U32 => DataType::U32,
            Self::U64 => DataType::U64,
            Self::Nested(_) => DataType::Nested,
            Self::Unspec(_) => DataType::Unspec,
        }
    }
}

/// Immutable description of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    name: String,
    nla_type: u16,
    nla_len: Option<u16>,
    kind: AttrKind,
}

impl AttributeSpec {
    /// Build a spec; `nla_len` constrains the payload length when present.
    pub fn new(
        name: impl Into<String>,
        nla_type: u16,
        nla_len: Option<u16>,
        kind: AttrKind,
    ) -> Result<Self, NlaError> {
        let name = name.into();
        let nla_len = match (&kind, nla_len) {
            (AttrKind::Unspec(len), None) => Some(*len),
            (AttrKind::Unspec(len), Some(declared)) if declared != *len => {
                return Err(NlaError::Schema(format!(
                    "{name}: nla_len {declared} disagrees with unspec length {len}"
                )));
            }
            (kind, Some(declared)) => {
                if let Some(width) = kind.data_type().scalar_width() {
                    if usize::from(declared) != width {
                        return Err(NlaError::Schema(format!(
                            "{name}: nla_len {declared} disagrees with {} width {width}",
                            kind.data_type()
                        )));
                    }
                }
                Some(declared)
            }
            (_, None) => None,
        };
        Ok(Self {
            name,
            nla_type,
            nla_len,
            kind,
        })
    }

    /// One-byte scalar attribute.
    #[must_use]
    pub fn u8(name: impl Into<String>, nla_type: u16) -> Self {
        Self::scalar(name, nla_type, AttrKind::U8)
    }

    /// Two-byte scalar attribute.
    #[must_use]
    pub fn u16(name: impl Into<String>, nla_type: u16) -> Self {
        Self::scalar(name, nla_type, AttrKind::U16)
    }

    /// Four-byte scalar attribute.
    #[must_use]
    pub fn u32(name: impl Into<String>, nla_type: u16) -> Self {
        Self::scalar(name, nla_type, AttrKind::U32)
    }

    /// Eight-byte scalar attribute.
    #[must_use]
    pub fn u64(name: impl Into<String>, nla_type: u16) -> Self {
        Self::scalar(name, nla_type, AttrKind::U64)
    }

    /// Fixed-length opaque attribute.
    #[must_use]
    pub fn unspec(name: impl Into<String>, nla_type: u16, len: u16) -> Self {
        Self {
            name: name.into(),
            nla_type,
            nla_len: Some(len),
            kind: AttrKind::Unspec(len),
        }
    }

    /// Container attribute with its child policy.
    #[must_use]
    pub fn nested(name: impl Into<String>, nla_type: u16, policy: Policy) -> Self {
        Self {
            name: name.into(),
            nla_type,
            nla_len: None,
            kind: AttrKind::Nested(policy),
        }
    }

    fn scalar(name: impl Into<String>, nla_type: u16, kind: AttrKind) -> Self {
        Self {
            name: name.into(),
            nla_type,
            nla_len: None,
            kind,
        }
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric type id.
    #[must_use]
    pub fn nla_type(&self) -> u16 {
        self.nla_type
    }

    /// Declared payload length, if constrained.
    #[must_use]
    pub fn nla_len(&self) -> Option<u16> {
        self.nla_len
    }

    /// Resolved kind.
    #[must_use]
    pub fn kind(&self) -> &AttrKind {
        &self.kind
    }

    /// Plain data type tag.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.kind.data_type()
    }

    /// Whether an observed record may be this attribute.
    #[must_use]
    pub fn matches_record(&self, nla_type: u16, payload_len: usize) -> bool {
        self.nla_type == nla_type
            && self
                .nla_len
                .map_or(true, |len| usize::from(len) == payload_len)
    }
}

/// Ordered collection of attribute specs with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    specs: Vec<AttributeSpec>,
}

impl Policy {
    /// Build a policy, rejecting duplicate names.
    pub fn new(specs: Vec<AttributeSpec>) -> Result<Self, NlaError> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(NlaError::Schema(format!(
                    "duplicate attribute {}",
                    spec.name
                )));
            }
        }
        Ok(Self { specs })
    }

    /// Parse a JSON schema document.
    pub fn from_json(document: &str) -> Result<Self, NlaError> {
        let entries: Vec<SchemaEntry> =
            serde_json::from_str(document).map_err(|err| NlaError::Schema(err.to_string()))?;
        Self::from_schema(entries)
    }

    /// Parse a JSON schema document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, NlaError> {
        let entries: Vec<SchemaEntry> =
            serde_json::from_reader(reader).map_err(|err| NlaError::Schema(err.to_string()))?;
        Self::from_schema(entries)
    }

    /// Resolve raw schema entries into a policy.
    pub fn from_schema(entries: Vec<SchemaEntry>) -> Result<Self, NlaError> {
        let specs = entries
            .into_iter()
            .map(SchemaEntry::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(specs)
    }

    /// Look up a spec by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// First spec accepting an observed record, in policy order.
    #[must_use]
    pub fn match_record(&self, nla_type: u16, payload_len: usize) -> Option<&AttributeSpec> {
        self.specs
            .iter()
            .find(|spec| spec.matches_record(nla_type, payload_len))
    }

    /// Iterate specs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.specs.iter()
    }

    /// Number of specs at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the policy is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Raw schema entry as stored in the JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Attribute name.
    pub name: String,
    /// Numeric type id.
    pub nla_type: u16,
    /// Expected payload length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nla_len: Option<u16>,
    /// Data type spelling.
    pub data_type: String,
    /// Child schema for nested attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<Vec<SchemaEntry>>,
}

impl SchemaEntry {
    fn resolve(self) -> Result<AttributeSpec, NlaError> {
        let data_type =
            DataType::parse(&self.data_type).ok_or_else(|| NlaError::UnsupportedType {
                name: self.name.clone(),
                data_type: self.data_type.clone(),
            })?;
        let kind = match data_type {
            DataType::U8 => AttrKind::U8,
            DataType::U16 => AttrKind::U16,
            DataType::U32 => AttrKind::U32,
            DataType::U64 => AttrKind::U64,
            DataType::Unspec => {
                let len = self.nla_len.ok_or_else(|| {
                    NlaError::Schema(format!("{}: unspec attribute needs nla_len", self.name))
                })?;
                AttrKind::Unspec(len)
            }
            DataType::Nested => {
                let children = self.nested.ok_or_else(|| {
                    NlaError::Schema(format!("{}: nested attribute needs a schema", self.name))
                })?;
                AttrKind::Nested(Policy::from_schema(children)?)
            }
        };
        AttributeSpec::new(self.name, self.nla_type, self.nla_len, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_prefixed_spellings() {
        let policy = Policy::from_json(
            r#"[
                {"name": "A", "nla_type": 1, "nla_len": 4, "data_type": "NLA_U32"},
                {"name": "B", "nla_type": 2, "data_type": "U8"}
            ]"#,
        )
        .expect("policy");
        assert_eq!(policy.get("A").map(AttributeSpec::data_type), Some(DataType::U32));
        assert_eq!(policy.get("B").and_then(AttributeSpec::nla_len), None);
    }

    #[test]
    fn rejects_unknown_data_type() {
        let err = Policy::from_json(r#"[{"name": "S", "nla_type": 3, "data_type": "NLA_STRING"}]"#)
            .expect_err("string kind is not implemented");
        assert_eq!(
            err,
            NlaError::UnsupportedType {
                name: "S".to_owned(),
                data_type: "NLA_STRING".to_owned(),
            }
        );
    }

    #[test]
    fn rejects_duplicates_and_inconsistent_lengths() {
        let dup = Policy::from_json(
            r#"[{"name": "A", "nla_type": 1, "data_type": "U8"},
                {"name": "A", "nla_type": 2, "data_type": "U8"}]"#,
        );
        assert!(matches!(dup, Err(NlaError::Schema(_))));

        let width = Policy::from_json(r#"[{"name": "A", "nla_type": 1, "nla_len": 2, "data_type": "U32"}]"#);
        assert!(matches!(width, Err(NlaError::Schema(_))));

        let unspec = Policy::from_json(r#"[{"name": "M", "nla_type": 6, "data_type": "UNSPEC"}]"#);
        assert!(matches!(unspec, Err(NlaError::Schema(_))));
    }

    #[test]
    fn record_matching_honours_length_constraint() {
        let policy = Policy::new(vec![
            AttributeSpec::unspec("MAC", 6, 6),
            AttributeSpec::u32("WORD", 7),
        ])
        .expect("policy");
        assert_eq!(policy.match_record(6, 6).map(AttributeSpec::name), Some("MAC"));
        assert!(policy.match_record(6, 4).is_none());
        assert_eq!(policy.match_record(7, 4).map(AttributeSpec::name), Some("WORD"));
    }
}
