// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Encode datasets into aligned NLA streams and decode them back.
// Author: Lukas Bower

//! Encode/decode helpers for NLA attribute streams.

use log::{debug, trace};

use crate::policy::{AttrKind, AttributeSpec, Policy};
use crate::types::*;

/// Encode `dataset` into a 4-byte aligned TLV stream under `policy`.
///
/// Entries are emitted in dataset order. Padding bytes are zero and are not
/// counted in a record's length field.
pub fn encode(dataset: &Dataset, policy: &Policy) -> Result<Vec<u8>, NlaError> {
    let mut out = Vec::new();
    for (name, attr) in dataset.iter() {
        let spec = lookup(policy, name, attr)?;
        let payload = encode_payload(spec, &attr.value)?;
        put_record(&mut out, spec, &payload)?;
    }
    Ok(out)
}

/// Decode a TLV stream into an ordered mapping under `policy`.
///
/// Records whose type id and length match no policy entry are skipped and
/// listed in [`Decoded::unmatched`]. Framing errors abort the decode.
pub fn decode(buf: &[u8], policy: &Policy) -> Result<Decoded, NlaError> {
    let mut decoded = Decoded::default();
    let mut cursor = Cursor::new(buf);
    while let Some(record) = cursor.next_record()? {
        let Some(spec) = policy.match_record(record.nla_type, record.payload.len()) else {
            debug!(
                "skipping unmatched attribute type={} len={} at offset {}",
                record.nla_type,
                record.payload.len(),
                record.offset
            );
            decoded.push_unmatched(UnmatchedAttribute {
                offset: record.offset,
                nla_type: record.nla_type,
                nla_len: record.payload.len(),
            });
            continue;
        };
        decoded.insert(decode_attr(spec, record.nla_type, record.payload)?);
    }
    Ok(decoded)
}

fn lookup<'p>(policy: &'p Policy, name: &str, attr: &Attr) -> Result<&'p AttributeSpec, NlaError> {
    let spec = policy
        .get(name)
        .ok_or_else(|| NlaError::UnknownAttribute(name.to_owned()))?;
    let type_ok = attr.nla_type.map_or(true, |t| t == spec.nla_type());
    // A length override is only checked when the spec declares a length.
    let len_ok = attr.nla_len.map_or(true, |l| spec.nla_len().map_or(true, |declared| declared == l));
    if type_ok && len_ok {
        Ok(spec)
    } else {
        Err(NlaError::UnknownAttribute(name.to_owned()))
    }
}

fn encode_payload(spec: &AttributeSpec, value: &AttrValue) -> Result<Vec<u8>, NlaError> {
    let name = spec.name();
    match (spec.kind(), value) {
        (AttrKind::Nested(child), AttrValue::Nested(inner)) => encode(inner, child),
        (AttrKind::Unspec(len), AttrValue::Bytes(bytes)) => {
            if bytes.len() != usize::from(*len) {
                return Err(NlaError::LengthMismatch {
                    name: name.to_owned(),
                    expected: usize::from(*len),
                    actual: bytes.len(),
                });
            }
            Ok(bytes.clone())
        }
        (AttrKind::Unspec(len), AttrValue::Scalar(value)) => {
            let width = usize::from(*len);
            if width > 8 {
                return Err(NlaError::ShapeMismatch {
                    name: name.to_owned(),
                    expected: spec.data_type(),
                });
            }
            pack_scalar(name, *value, width)
        }
        (kind, AttrValue::Scalar(value)) => match kind.data_type().scalar_width() {
            Some(width) => pack_scalar(name, *value, width),
            None => Err(NlaError::ShapeMismatch {
                name: name.to_owned(),
                expected: spec.data_type(),
            }),
        },
        _ => Err(NlaError::ShapeMismatch {
            name: name.to_owned(),
            expected: spec.data_type(),
        }),
    }
}

fn pack_scalar(name: &str, value: u64, width: usize) -> Result<Vec<u8>, NlaError> {
    if width < 8 && value >> (width * 8) != 0 {
        return Err(NlaError::ValueOutOfRange {
            name: name.to_owned(),
            value,
            width,
        });
    }
    Ok(value.to_le_bytes()[..width].to_vec())
}

fn put_record(out: &mut Vec<u8>, spec: &AttributeSpec, payload: &[u8]) -> Result<(), NlaError> {
    let total = NLA_HDRLEN + payload.len();
    let declared = u16::try_from(total).map_err(|_| NlaError::RecordTooLarge {
        name: spec.name().to_owned(),
        len: total,
    })?;
    out.extend_from_slice(&declared.to_le_bytes());
    out.extend_from_slice(&spec.nla_type().to_le_bytes());
    out.extend_from_slice(payload);
    out.resize(out.len() + nla_align(total) - total, 0);
    trace!("encoded {} type={} len={}", spec.name(), spec.nla_type(), declared);
    Ok(())
}

fn decode_attr(spec: &AttributeSpec, nla_type: u16, payload: &[u8]) -> Result<DecodedAttribute, NlaError> {
    let (value, value_raw) = match spec.kind() {
        AttrKind::Nested(child) => (DecodedValue::Nested(decode(payload, child)?), None),
        AttrKind::Unspec(_) if payload.len() > 8 => (DecodedValue::Bytes(payload.to_vec()), None),
        AttrKind::Unspec(_) => (DecodedValue::Scalar(unpack_scalar(payload)), Some(be_hex(payload))),
        kind => {
            let width = kind.data_type().scalar_width().unwrap_or(payload.len());
            if payload.len() < width {
                return Err(FrameError::ShortScalar {
                    name: spec.name().to_owned(),
                    width,
                    actual: payload.len(),
                }
                .into());
            }
            let scalar = &payload[..width];
            (DecodedValue::Scalar(unpack_scalar(scalar)), Some(be_hex(scalar)))
        }
    };
    Ok(DecodedAttribute {
        name: spec.name().to_owned(),
        nla_type,
        data_type: spec.data_type(),
        payload: payload.to_vec(),
        value,
        value_raw,
    })
}

fn unpack_scalar(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

fn be_hex(payload: &[u8]) -> String {
    let reversed: Vec<u8> = payload.iter().rev().copied().collect();
    hex::encode(reversed)
}

struct Record<'a> {
    offset: usize,
    nla_type: u16,
    payload: &'a [u8],
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn next_record(&mut self) -> Result<Option<Record<'a>>, FrameError> {
        let offset = self.pos;
        let remaining = self.buf.len().saturating_sub(offset);
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < NLA_HDRLEN {
            return Err(FrameError::TruncatedHeader { offset, remaining });
        }
        let header = &self.buf[offset..offset + NLA_HDRLEN];
        let declared = u16::from_le_bytes([header[0], header[1]]);
        let nla_type = u16::from_le_bytes([header[2], header[3]]) & NLA_TYPE_MASK;
        let len = usize::from(declared);
        if len < NLA_HDRLEN {
            return Err(FrameError::LengthBelowHeader { offset, declared });
        }
        if len > remaining {
            return Err(FrameError::Overrun {
                offset,
                declared,
                buffer: self.buf.len(),
            });
        }
        let payload = &self.buf[offset + NLA_HDRLEN..offset + len];
        // Trailing padding of the final record may be absent.
        self.pos = offset.saturating_add(nla_align(len)).min(self.buf.len());
        Ok(Some(Record {
            offset,
            nla_type,
            payload,
        }))
    }
}
