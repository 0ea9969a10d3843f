// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Pack and unpack phased-array sector configuration registers.
// Author: Lukas Bower

//! Bit-exact conversion between antenna sector settings and the six
//! firmware register words that carry them.
//!
//! The register layout is fixed by the radio firmware:
//!
//! * `psh`: 32 two-bit phase shifts, indices 0..16 in `psh_lo`, 16..32 in
//!   `psh_hi`, each at bit `2 * (index % 16)`.
//! * `etype`: 32 three-bit edge amplifier gains stored as bit planes; bit
//!   `b` of element `i` lives at bit `i` of `etype{b}`.
//! * `dtype`: 8 three-bit distribution amplifier gains at bit `3 * i` of
//!   `dtype_x16`, with the `x16` switch byte in bits 24..32.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of phase shifter entries.
pub const PSH_ENTRIES: usize = 32;
/// Number of edge amplifier entries.
pub const ETYPE_ENTRIES: usize = 32;
/// Number of distribution amplifier entries.
pub const DTYPE_ENTRIES: usize = 8;

const PSH_MAX: u8 = 0x3;
const ETYPE_MAX: u8 = 0x7;
const DTYPE_MAX: u8 = 0x7;

/// Sector direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SectorType {
    /// Receive sector.
    Rx,
    /// Transmit sector.
    Tx,
}

impl SectorType {
    /// Wire value: 0 for RX, 1 for TX.
    #[must_use]
    pub fn raw(self) -> u8 {
        match self {
            Self::Rx => 0,
            Self::Tx => 1,
        }
    }
}

/// Register words as exchanged with the firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRegisters {
    /// Phase shifts 16..32.
    pub psh_hi: u32,
    /// Phase shifts 0..16.
    pub psh_lo: u32,
    /// Edge amplifier bit plane 0.
    pub etype0: u32,
    /// Edge amplifier bit plane 1.
    pub etype1: u32,
    /// Edge amplifier bit plane 2.
    pub etype2: u32,
    /// Distribution amplifiers and x16 switch.
    pub dtype_x16: u32,
}

/// Decoded sector settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorConfig {
    /// Phase shift per RF chain, each in `0..=3`.
    pub psh: Vec<u8>,
    /// Edge amplifier gain per RF chain, each in `0..=7`.
    pub etype: Vec<u8>,
    /// Distribution amplifier gain, each in `0..=7`.
    pub dtype: Vec<u8>,
    /// X16 switch byte.
    pub x16: u8,
}

impl SectorConfig {
    /// True when every amplifier setting is zero.
    #[must_use]
    pub fn amplifiers_off(&self) -> bool {
        self.etype.iter().all(|v| *v == 0) && self.dtype.iter().all(|v| *v == 0)
    }
}

impl Default for SectorConfig {
    fn default() -> Self {
        Self {
            psh: vec![0; PSH_ENTRIES],
            etype: vec![0; ETYPE_ENTRIES],
            dtype: vec![0; DTYPE_ENTRIES],
            x16: 0,
        }
    }
}

/// Sector configuration entry tagged with its sector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebookEntry {
    /// Sector index.
    pub sid: u16,
    /// Sector settings.
    #[serde(flatten)]
    pub config: SectorConfig,
}

/// Invalid sector settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SectorError {
    /// Array has the wrong number of entries.
    #[error("{field}: expected {expected} entries, got {actual}")]
    Length {
        /// Field name.
        field: &'static str,
        /// Required entry count.
        expected: usize,
        /// Supplied entry count.
        actual: usize,
    },
    /// Entry exceeds its bit width.
    #[error("{field}[{index}] = {value} exceeds {max}")]
    ValueOutOfRange {
        /// Field name.
        field: &'static str,
        /// Entry index.
        index: usize,
        /// Supplied value.
        value: u8,
        /// Largest encodable value.
        max: u8,
    },
}

fn validate(field: &'static str, values: &[u8], expected: usize, max: u8) -> Result<(), SectorError> {
    if values.len() != expected {
        return Err(SectorError::Length {
            field,
            expected,
            actual: values.len(),
        });
    }
    match values.iter().position(|v| *v > max) {
        Some(index) => Err(SectorError::ValueOutOfRange {
            field,
            index,
            value: values[index],
            max,
        }),
        None => Ok(()),
    }
}

/// Pack 32 phase shifts into `(psh_hi, psh_lo)`.
pub fn pack_psh(psh: &[u8]) -> Result<(u32, u32), SectorError> {
    validate("psh", psh, PSH_ENTRIES, PSH_MAX)?;
    let (lo, hi) = psh.split_at(PSH_ENTRIES / 2);
    let pack = |half: &[u8]| {
        half.iter()
            .enumerate()
            .fold(0u32, |word, (n, v)| word | (u32::from(*v) << (2 * n)))
    };
    Ok((pack(hi), pack(lo)))
}

/// Unpack phase shifts from `(psh_hi, psh_lo)`.
#[must_use]
pub fn unpack_psh(psh_hi: u32, psh_lo: u32) -> Vec<u8> {
    (0..PSH_ENTRIES)
        .map(|n| {
            let (word, shift) = if n < 16 { (psh_lo, 2 * n) } else { (psh_hi, 2 * (n - 16)) };
            ((word >> shift) & u32::from(PSH_MAX)) as u8
        })
        .collect()
}

/// Pack 32 edge amplifier gains into three bit planes.
pub fn pack_etype(etype: &[u8]) -> Result<(u32, u32, u32), SectorError> {
    validate("etype", etype, ETYPE_ENTRIES, ETYPE_MAX)?;
    let plane = |bit: u32| {
        etype
            .iter()
            .enumerate()
            .fold(0u32, |word, (n, v)| word | (((u32::from(*v) >> bit) & 1) << n))
    };
    Ok((plane(0), plane(1), plane(2)))
}

/// Unpack edge amplifier gains from their bit planes.
#[must_use]
pub fn unpack_etype(etype0: u32, etype1: u32, etype2: u32) -> Vec<u8> {
    (0..ETYPE_ENTRIES)
        .map(|n| {
            let bit = |word: u32| ((word >> n) & 1) as u8;
            bit(etype0) | (bit(etype1) << 1) | (bit(etype2) << 2)
        })
        .collect()
}

/// Pack distribution amplifier gains and the x16 switch into one word.
pub fn pack_dtype_x16(dtype: &[u8], x16: u8) -> Result<u32, SectorError> {
    validate("dtype", dtype, DTYPE_ENTRIES, DTYPE_MAX)?;
    Ok(dtype
        .iter()
        .enumerate()
        .fold(u32::from(x16) << 24, |word, (n, v)| word | (u32::from(*v) << (3 * n))))
}

/// Unpack distribution amplifier gains and the x16 switch.
#[must_use]
pub fn unpack_dtype_x16(dtype_x16: u32) -> (Vec<u8>, u8) {
    let dtype = (0..DTYPE_ENTRIES)
        .map(|n| ((dtype_x16 >> (3 * n)) & u32::from(DTYPE_MAX)) as u8)
        .collect();
    (dtype, (dtype_x16 >> 24) as u8)
}

/// Convert settings into register words, validating every array.
pub fn encode_sector_config(config: &SectorConfig) -> Result<SectorRegisters, SectorError> {
    let (psh_hi, psh_lo) = pack_psh(&config.psh)?;
    let (etype0, etype1, etype2) = pack_etype(&config.etype)?;
    let dtype_x16 = pack_dtype_x16(&config.dtype, config.x16)?;
    Ok(SectorRegisters {
        psh_hi,
        psh_lo,
        etype0,
        etype1,
        etype2,
        dtype_x16,
    })
}

/// Convert register words into settings.
#[must_use]
pub fn decode_sector_config(registers: &SectorRegisters) -> SectorConfig {
    let (dtype, x16) = unpack_dtype_x16(registers.dtype_x16);
    SectorConfig {
        psh: unpack_psh(registers.psh_hi, registers.psh_lo),
        etype: unpack_etype(registers.etype0, registers.etype1, registers.etype2),
        dtype,
        x16,
    }
}
