// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Read and program antenna sectors through QCA vendor commands.
// Author: Lukas Bower

//! RF sector control over the vendor command channel.
//!
//! Sector registers travel as `QCA_ATTR_DMG_RF_SECTOR_CFG` nested
//! attributes; only RF module 0 is addressed. The codebook helpers convert
//! between register words and [`SectorConfig`] with the sector codec.

use log::{debug, info};
use nla_codec::{Dataset, Decoded, NlaError, Policy};

use crate::error::NodeError;
use crate::mac::MacAddr;
use crate::radio::RadioHandle;
use crate::sector::{decode_sector_config, encode_sector_config, CodebookEntry, SectorConfig, SectorRegisters, SectorType};
use crate::vendor::{required_nested, required_scalar, TransportError, VendorTransport};

/// Vendor subcommand reading a sector configuration.
pub const GET_SECTOR_CFG: u32 = 0x8b;
/// Vendor subcommand writing a sector configuration.
pub const SET_SECTOR_CFG: u32 = 0x8c;
/// Vendor subcommand reading the sector selected towards a peer.
pub const GET_SELECTED_SECTOR: u32 = 0x8d;
/// Vendor subcommand forcing the sector used towards a peer.
pub const SET_SELECTED_SECTOR: u32 = 0x8e;

/// Sectors read by [`RfAntenna::get_rf_tx_sector_codebook`] by default.
pub const DEFAULT_CODEBOOK_SECTORS: u16 = 64;

const MODULE_0_MASK: u32 = 0x01;

const MAC_ADDR: &str = "QCA_ATTR_MAC_ADDR";
const SECTOR_INDEX: &str = "QCA_ATTR_DMG_RF_SECTOR_INDEX";
const SECTOR_TYPE: &str = "QCA_ATTR_DMG_RF_SECTOR_TYPE";
const MODULE_MASK: &str = "QCA_ATTR_DMG_RF_MODULE_MASK";
const SECTOR_CFG: &str = "QCA_ATTR_DMG_RF_SECTOR_CFG";
const MODULE_0: &str = "QCA_ATTR_DMG_RF_SECTOR_CFG_MODULE_0";
const MODULE_INDEX: &str = "QCA_ATTR_DMG_RF_SECTOR_CFG_MODULE_INDEX";
const ETYPE0: &str = "QCA_ATTR_DMG_RF_SECTOR_CFG_ETYPE0";
const ETYPE1: &str = "QCA_ATTR_DMG_RF_SECTOR_CFG_ETYPE1";
const ETYPE2: &str = "QCA_ATTR_DMG_RF_SECTOR_CFG_ETYPE2";
const PSH_HI: &str = "QCA_ATTR_DMG_RF_SECTOR_CFG_PSH_HI";
const PSH_LO: &str = "QCA_ATTR_DMG_RF_SECTOR_CFG_PSH_LO";
const DTYPE_X16: &str = "QCA_ATTR_DMG_RF_SECTOR_CFG_DTYPE_X16";

/// Decides which sectors a codebook read keeps when invalid ones are ignored.
pub trait SectorFilter: Send + Sync {
    /// True when sector `sid` looks programmed.
    fn is_programmed(&self, sid: u16, config: &SectorConfig) -> bool;
}

/// Treats a sector whose edge and distribution amplifiers are all zero as
/// unprogrammed.
///
/// This is an approximation: a sector deliberately programmed with every
/// amplifier off is indistinguishable from an empty slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroAmplifierHeuristic;

impl SectorFilter for ZeroAmplifierHeuristic {
    fn is_programmed(&self, _sid: u16, config: &SectorConfig) -> bool {
        !config.amplifiers_off()
    }
}

/// Sector control for one radio.
pub struct RfAntenna<'a> {
    radio: &'a RadioHandle,
    policy: &'a Policy,
    filter: Box<dyn SectorFilter>,
}

impl<'a> RfAntenna<'a> {
    /// Sector control using `policy` for every vendor command.
    #[must_use]
    pub fn new(radio: &'a RadioHandle, policy: &'a Policy) -> Self {
        Self {
            radio,
            policy,
            filter: Box::new(ZeroAmplifierHeuristic),
        }
    }

    /// Replace the codebook sector filter.
    #[must_use]
    pub fn with_filter(mut self, filter: impl SectorFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    fn issue(&self, command_id: u32, request: &Dataset) -> Result<Decoded, TransportError> {
        VendorTransport::for_radio(self.radio).issue(command_id, request, self.policy)
    }

    /// Sector currently used towards `peer`.
    pub fn get_selected_sector(&self, sector_type: SectorType, peer: MacAddr) -> Result<u16, NodeError> {
        let request = Dataset::new()
            .with(SECTOR_TYPE, sector_type.raw())
            .with(MAC_ADDR, peer.octets().to_vec());
        let response = self.issue(GET_SELECTED_SECTOR, &request)?;
        let index = narrow(GET_SELECTED_SECTOR, SECTOR_INDEX, required_scalar(&response, GET_SELECTED_SECTOR, SECTOR_INDEX)?)?;
        debug!("{}: selected {sector_type:?} sector towards {peer} is {index}", self.radio.name());
        Ok(index)
    }

    /// Force the sector used towards `peer`.
    pub fn set_selected_sector(&self, sector_type: SectorType, peer: MacAddr, index: u16) -> Result<(), NodeError> {
        info!("{}: selecting {sector_type:?} sector {index} towards {peer}", self.radio.name());
        let request = Dataset::new()
            .with(SECTOR_INDEX, index)
            .with(SECTOR_TYPE, sector_type.raw())
            .with(MAC_ADDR, peer.octets().to_vec());
        self.issue(SET_SELECTED_SECTOR, &request)?;
        Ok(())
    }

    /// Register words of sector `index` on RF module 0.
    pub fn get_sector_config(&self, sector_type: SectorType, index: u16) -> Result<SectorRegisters, NodeError> {
        let request = Dataset::new()
            .with(SECTOR_INDEX, index)
            .with(SECTOR_TYPE, sector_type.raw())
            .with(MODULE_MASK, MODULE_0_MASK);
        let response = self.issue(GET_SECTOR_CFG, &request)?;
        let modules = required_nested(&response, GET_SECTOR_CFG, SECTOR_CFG)?;
        let module = required_nested(modules, GET_SECTOR_CFG, MODULE_0)?;
        let word = |name: &str| -> Result<u32, NodeError> {
            narrow(GET_SECTOR_CFG, name, required_scalar(module, GET_SECTOR_CFG, name)?)
        };
        Ok(SectorRegisters {
            psh_hi: word(PSH_HI)?,
            psh_lo: word(PSH_LO)?,
            etype0: word(ETYPE0)?,
            etype1: word(ETYPE1)?,
            etype2: word(ETYPE2)?,
            dtype_x16: word(DTYPE_X16)?,
        })
    }

    /// Program sector `index` on RF module 0.
    pub fn set_sector_config(
        &self,
        sector_type: SectorType,
        index: u16,
        registers: &SectorRegisters,
    ) -> Result<(), NodeError> {
        info!("{}: programming {sector_type:?} sector {index}", self.radio.name());
        let module = Dataset::new()
            .with(MODULE_INDEX, 0u8)
            .with(ETYPE0, registers.etype0)
            .with(ETYPE1, registers.etype1)
            .with(ETYPE2, registers.etype2)
            .with(PSH_HI, registers.psh_hi)
            .with(PSH_LO, registers.psh_lo)
            .with(DTYPE_X16, registers.dtype_x16);
        let request = Dataset::new()
            .with(SECTOR_INDEX, index)
            .with(SECTOR_TYPE, sector_type.raw())
            .with(SECTOR_CFG, Dataset::new().with(MODULE_0, module));
        self.issue(SET_SECTOR_CFG, &request)?;
        Ok(())
    }

    /// Decoded TX sector `index`.
    pub fn get_rf_tx_sector_config(&self, index: u16) -> Result<SectorConfig, NodeError> {
        Ok(decode_sector_config(&self.get_sector_config(SectorType::Tx, index)?))
    }

    /// Decoded RX sector `index`.
    pub fn get_rf_rx_sector_config(&self, index: u16) -> Result<SectorConfig, NodeError> {
        Ok(decode_sector_config(&self.get_sector_config(SectorType::Rx, index)?))
    }

    /// Validate and program TX sector `index`.
    pub fn set_rf_tx_sector_config(&self, index: u16, config: &SectorConfig) -> Result<(), NodeError> {
        self.set_sector_config(SectorType::Tx, index, &encode_sector_config(config)?)
    }

    /// Validate and program RX sector `index`.
    pub fn set_rf_rx_sector_config(&self, index: u16, config: &SectorConfig) -> Result<(), NodeError> {
        self.set_sector_config(SectorType::Rx, index, &encode_sector_config(config)?)
    }

    /// Read TX sectors `0..max_sectors`; with `ignore_invalid`, sectors the
    /// filter rejects are left out.
    pub fn get_rf_tx_sector_codebook(&self, max_sectors: u16, ignore_invalid: bool) -> Result<Vec<CodebookEntry>, NodeError> {
        let mut codebook = Vec::new();
        for sid in 0..max_sectors {
            let config = self.get_rf_tx_sector_config(sid)?;
            if ignore_invalid && !self.filter.is_programmed(sid, &config) {
                debug!("{}: skipping unprogrammed TX sector {sid}", self.radio.name());
                continue;
            }
            codebook.push(CodebookEntry { sid, config });
        }
        info!("{}: read {} TX sector(s)", self.radio.name(), codebook.len());
        Ok(codebook)
    }

    /// Program every entry of `codebook`, in order.
    pub fn set_rf_tx_sector_codebook(&self, codebook: &[CodebookEntry]) -> Result<(), NodeError> {
        for entry in codebook {
            self.set_rf_tx_sector_config(entry.sid, &entry.config)?;
        }
        Ok(())
    }
}

fn narrow<T: TryFrom<u64>>(command_id: u32, name: &str, value: u64) -> Result<T, NodeError> {
    T::try_from(value).map_err(|_| {
        TransportError::Decode {
            command_id,
            source: NlaError::ValueOutOfRange {
                name: name.to_owned(),
                value,
                width: std::mem::size_of::<T>(),
            },
        }
        .into()
    })
}
