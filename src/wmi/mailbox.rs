// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Parse the wil6210 mailbox dump into WMI records.
// Author: Lukas Bower

//! Parser for the `wil6210/mbox` debug file.
//!
//! The file renders both mailbox rings as text:
//!
//! ```text
//! ring tx = {
//!   base = 0x008... size = 0x0200 tail = 0x... head = 0x...
//!   [ 0] E 0x0088f4c0 -> 0000 0000 0000 0000
//!      : 00 00 03 08 00 00 00 00 68 65 6c 6c 6f
//! }
//! ring rx = {
//!   ...
//! }
//! ```
//!
//! Each `[xx]` marker opens a slot; the rest of the marker line is
//! descriptor state and is ignored. The hex dump lines that follow carry the
//! 8-byte WMI header and the payload.

use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;
use serde::Serialize;

use crate::hexdump::{self, HexdumpError};

/// Length of the WMI command/event header.
pub const WMI_HDR_LEN: usize = 8;

const RX_RING_MARKER: &str = "ring rx = ";

/// Mailbox direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ring {
    /// Host to firmware commands.
    Tx,
    /// Firmware to host events.
    Rx,
}

/// One mailbox record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WmiEvent {
    /// Ring the record was found in.
    pub ring: Ring,
    /// Ring slot index.
    pub slot: u16,
    /// Mailbox id byte of the header.
    pub mid: u8,
    /// Command or event id.
    pub id: u16,
    /// Firmware timestamp from the header.
    pub timestamp: u32,
    /// Bytes following the header.
    #[serde(with = "hex_payload")]
    pub payload: Vec<u8>,
}

mod hex_payload {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(payload))
    }
}

/// Parse a mailbox dump into a flat list, tx ring first.
pub fn parse_mailbox(text: &str) -> Result<Vec<WmiEvent>, HexdumpError> {
    let (tx, rx) = match text.split_once(RX_RING_MARKER) {
        Some((tx, rx)) => (tx, rx),
        None => (text, ""),
    };
    let mut events = parse_ring(tx, Ring::Tx)?;
    events.extend(parse_ring(rx, Ring::Rx)?);
    debug!("mailbox holds {} record(s)", events.len());
    Ok(events)
}

fn parse_ring(section: &str, ring: Ring) -> Result<Vec<WmiEvent>, HexdumpError> {
    static SLOT_MARKER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let marker = hexdump::pattern(&SLOT_MARKER, r"\[\s*([0-9a-fA-F]{1,4})\]")?;

    let slots: Vec<(u16, usize, usize)> = marker
        .captures_iter(section)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let slot = u16::from_str_radix(caps.get(1)?.as_str(), 16).ok()?;
            Some((slot, whole.start(), whole.end()))
        })
        .collect();

    let mut events = Vec::new();
    for (i, (slot, _, body_start)) in slots.iter().enumerate() {
        let body_end = slots.get(i + 1).map_or(section.len(), |next| next.1);
        let body = &section[*body_start..body_end];
        let dump = body.split_once('\n').map_or("", |(_, rest)| rest);
        let bytes = hexdump::scan(dump)?;
        if bytes.is_empty() {
            continue;
        }
        match record(ring, *slot, &bytes) {
            Some(event) => events.push(event),
            None => warn!("{ring:?} slot {slot:#x}: {}-byte record shorter than header", bytes.len()),
        }
    }
    Ok(events)
}

fn record(ring: Ring, slot: u16, bytes: &[u8]) -> Option<WmiEvent> {
    if bytes.len() < WMI_HDR_LEN {
        return None;
    }
    let (header, payload) = bytes.split_at(WMI_HDR_LEN);
    Some(WmiEvent {
        ring,
        slot,
        mid: header[0],
        id: u16::from_le_bytes([header[2], header[3]]),
        timestamp: u32::from_le_bytes([header[4], header[5], header[6], header[7]]),
        payload: payload.to_vec(),
    })
}
