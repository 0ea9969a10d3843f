// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Encode firmware WMI command structs and decode their completion events.
// Author: Lukas Bower

//! Firmware operations on top of [`WmiClient::call`].
//!
//! Struct layouts follow the wil6210 `wmi.h` ABI byte for byte; all
//! multi-byte fields are little-endian and packed.

use bitflags::bitflags;
use log::warn;
use serde::{Deserialize, Serialize};

use super::{Completion, FwStatus, Ring, StatusTable, WmiClient, WmiError, WmiEvent};
use crate::mac::MacAddr;
use crate::sector::SectorType;

/// Number of MCS entries in rate tables.
pub const WMI_NUM_MCS: usize = 13;

/// Capacity of the sector priority array.
pub const MAX_NUM_OF_SECTORS: usize = 128;

/// Capacity of the AoA measurement buffer in bytes.
pub const WMI_AOA_MAX_DATA_SIZE: usize = 128;

/// Terminator for the sector priority array.
pub const SECTOR_ORDER_END: u8 = 0xFF;

/// Command ids and their completion event ids.
pub mod ids {
    #![allow(missing_docs)]
    pub const WMI_ECHO_CMDID: u16 = 0x0803;
    pub const WMI_ECHO_RSP_EVENTID: u16 = 0x1803;
    pub const WMI_SET_ACTIVE_SILENT_RSSI_TABLE_CMDID: u16 = 0x085C;
    pub const WMI_SET_SILENT_RSSI_TABLE_DONE_EVENTID: u16 = 0x185C;
    pub const WMI_PS_DEV_PROFILE_CFG_CMDID: u16 = 0x091C;
    pub const WMI_PS_DEV_PROFILE_CFG_EVENTID: u16 = 0x191C;
    pub const WMI_RS_CFG_CMDID: u16 = 0x0921;
    pub const WMI_RS_CFG_DONE_EVENTID: u16 = 0x1921;
    pub const WMI_GET_DETAILED_RS_RES_CMDID: u16 = 0x0922;
    pub const WMI_GET_DETAILED_RS_RES_EVENTID: u16 = 0x1922;
    pub const WMI_AOA_MEAS_CMDID: u16 = 0x0923;
    pub const WMI_AOA_MEAS_EVENTID: u16 = 0x1923;
    pub const WMI_PS_DEV_PROFILE_CFG_READ_CMDID: u16 = 0x0942;
    pub const WMI_PS_DEV_PROFILE_CFG_READ_EVENTID: u16 = 0x1942;
    pub const WMI_SET_RF_SECTOR_ON_CMDID: u16 = 0x09A4;
    pub const WMI_SET_RF_SECTOR_ON_DONE_EVENTID: u16 = 0x19A4;
    pub const WMI_PRIO_TX_SECTORS_ORDER_CMDID: u16 = 0x09A5;
    pub const WMI_PRIO_TX_SECTORS_ORDER_EVENTID: u16 = 0x19A5;
    pub const WMI_PRIO_TX_SECTORS_NUMBER_CMDID: u16 = 0x09A6;
    pub const WMI_PRIO_TX_SECTORS_NUMBER_EVENTID: u16 = 0x19A6;
    pub const WMI_PRIO_TX_SECTORS_SET_DEFAULT_CFG_CMDID: u16 = 0x09A7;
    pub const WMI_PRIO_TX_SECTORS_SET_DEFAULT_CFG_EVENTID: u16 = 0x19A7;
    pub const WMI_BF_CONTROL_CMDID: u16 = 0x09AA;
    pub const WMI_BF_CONTROL_EVENTID: u16 = 0x19AA;
}

use ids::*;

/// Rate search configuration for one connection (`wmi_rs_cfg_cmd`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsCfg {
    /// Connection id.
    pub cid: u8,
    /// Enable rate search.
    pub rs_enable: bool,
    /// Maximal PER per MCS before the MCS counts as failed.
    pub per_threshold: [u8; WMI_NUM_MCS],
    /// Minimal MPDU count per MCS for a decision.
    pub min_frame_cnt: [u8; WMI_NUM_MCS],
    /// Stop threshold, 0..=100.
    pub stop_th: u8,
    /// MCS1 stop threshold, 0..=100.
    pub mcs1_fail_th: u8,
    /// Maximal block-ack failures.
    pub max_back_failure_th: u8,
    /// Disable the firmware's internal rate search trigger.
    pub dbg_disable_internal_trigger: u8,
    /// Block-ack failure mask.
    pub back_failure_mask: u32,
    /// Enabled MCS bit vector.
    pub mcs_en_vec: u32,
}

impl RsCfg {
    /// Encoded size of `wmi_rs_cfg_cmd`.
    pub const WIRE_LEN: usize = 40;

    /// Firmware default configuration for `cid`.
    #[must_use]
    pub fn new(cid: u8) -> Self {
        Self {
            cid,
            rs_enable: true,
            per_threshold: [0, 0, 40, 15, 10, 0, 20, 15, 10, 0, 15, 10, 10],
            min_frame_cnt: [0x00, 0x20, 0x40, 0x40, 0x40, 0x00, 0x50, 0x50, 0x50, 0x00, 0xA0, 0xA0, 0xA0],
            stop_th: 0x01,
            mcs1_fail_th: 0x50,
            max_back_failure_th: 0x03,
            dbg_disable_internal_trigger: 0x00,
            back_failure_mask: 0x0010,
            mcs_en_vec: 0x1dde,
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        buf.push(self.cid);
        buf.push(u8::from(self.rs_enable));
        buf.extend_from_slice(&self.per_threshold);
        buf.extend_from_slice(&self.min_frame_cnt);
        buf.extend_from_slice(&[
            self.stop_th,
            self.mcs1_fail_th,
            self.max_back_failure_th,
            self.dbg_disable_internal_trigger,
        ]);
        buf.extend_from_slice(&self.back_failure_mask.to_le_bytes());
        buf.extend_from_slice(&self.mcs_en_vec.to_le_bytes());
        buf
    }
}

/// Detailed rate search results (`wmi_get_detailed_rs_res_event`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RsResults {
    /// Connection id.
    pub cid: u8,
    /// Transmitted packets per MCS.
    pub num_of_tx_pkt: [u8; WMI_NUM_MCS],
    /// Unacknowledged packets per MCS.
    pub num_of_non_acked_pkt: [u8; WMI_NUM_MCS],
    /// TSF of the measurement.
    pub tsf: u32,
    /// Selected MCS.
    pub mcs: u8,
}

/// AoA measurement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AoaMeasType {
    /// Phase only.
    Phase,
    /// Phase and amplitude.
    PhaseAmp,
}

impl AoaMeasType {
    fn raw(self) -> u8 {
        match self {
            Self::Phase => 0x00,
            Self::PhaseAmp => 0x01,
        }
    }
}

/// AoA measurement result (`wmi_aoa_meas_event`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AoaMeasurement {
    /// Measured peer.
    pub peer: MacAddr,
    /// Channel index.
    pub channel: u8,
    /// Raw measurement kind.
    pub meas_type: u8,
    /// RF chains that contributed.
    pub rf_mask: u32,
    /// Measurement samples.
    pub samples: Vec<u16>,
}

/// Device power save profile (`wmi_ps_profile_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PsProfile {
    /// Firmware default.
    Default,
    /// Power save disabled.
    PsDisabled,
    /// Maximal power save.
    MaxPs,
    /// Low latency power save.
    LowLatencyPs,
}

impl PsProfile {
    fn raw(self) -> u8 {
        match self {
            Self::Default => 0x00,
            Self::PsDisabled => 0x01,
            Self::MaxPs => 0x02,
            Self::LowLatencyPs => 0x03,
        }
    }

    fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0x00 => Self::Default,
            0x01 => Self::PsDisabled,
            0x02 => Self::MaxPs,
            0x03 => Self::LowLatencyPs,
            _ => return None,
        })
    }
}

/// Sector sweep the priority settings apply to (`wmi_sector_sweep_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SweepType {
    /// Transmit sector sweep.
    Txss,
    /// Beacon.
    Beacon,
    /// Both.
    TxssAndBeacon,
}

impl SweepType {
    fn raw(self) -> u8 {
        match self {
            Self::Txss => 0x00,
            Self::Beacon => 0x01,
            Self::TxssAndBeacon => 0x02,
        }
    }
}

/// Silent RSSI calibration table (`wmi_silent_rssi_table`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SilentRssiTable {
    /// Default calibration.
    Default,
    /// High power calibration.
    HighPower,
}

impl SilentRssiTable {
    fn raw(self) -> u32 {
        match self {
            Self::Default => 0x00,
            Self::HighPower => 0x01,
        }
    }
}

bitflags! {
    /// Beamforming triggers (`wmi_bf_triggers`).
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BfTriggers: u32 {
        /// Rate search MCS1 threshold failure.
        const RS_MCS1_TH_FAILURE = 0x01;
        /// Rate search MCS1 without block-ack failure.
        const RS_MCS1_NO_BACK_FAILURE = 0x02;
        /// CTS failures within a TXOP.
        const MAX_CTS_FAILURE_IN_TXOP = 0x04;
        /// Block-ack failures.
        const MAX_BACK_FAILURE = 0x08;
        /// Firmware initiated.
        const FW = 0x10;
        /// CTS failures during keep-alive.
        const MAX_CTS_FAILURE_IN_KEEP_ALIVE = 0x20;
        /// Angle of arrival.
        const AOA = 0x40;
        /// CTS failures during UPM.
        const MAX_CTS_FAILURE_IN_UPM = 0x80;
    }
}

/// Beamforming stage mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BfMode {
    /// Stage disabled.
    #[default]
    Disabled,
    /// Stage enabled.
    Enabled,
    /// Stage evaluated without effect.
    DryRun,
}

impl BfMode {
    fn raw(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
            Self::DryRun => 2,
        }
    }
}

/// Beamforming control (`wmi_bf_control_cmd`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BfControl {
    /// Enabled triggers.
    pub triggers: BfTriggers,
    /// Connection id.
    pub cid: u8,
    /// TXSS stage mode.
    pub txss_mode: BfMode,
    /// BRP stage mode.
    pub brp_mode: BfMode,
    /// CTS failure threshold.
    pub max_cts_failure_thr: u8,
    /// CTS failure threshold in dense environments.
    pub max_cts_failure_dense_thr: u8,
    /// Block-ack failure threshold.
    pub max_back_failure_thr: u8,
    /// Block-ack failure threshold in dense environments.
    pub max_back_failure_dense_thr: u8,
    /// Wrong sector threshold.
    pub wrong_sector_bis_thr: u32,
    /// Enable the long term trigger.
    pub long_term_enable: bool,
    /// Apply the long term tables below.
    pub long_term_update_thr: bool,
    /// Long term throughput threshold per MCS in Mbps.
    pub long_term_mbps_th_tbl: [u8; WMI_NUM_MCS],
    /// Long term timeout per MCS in ms.
    pub long_term_trig_timeout_per_mcs: [u16; WMI_NUM_MCS],
}

impl BfControl {
    /// Encoded size of `wmi_bf_control_cmd`.
    pub const WIRE_LEN: usize = 60;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        buf.extend_from_slice(&self.triggers.bits().to_le_bytes());
        buf.extend_from_slice(&[
            self.cid,
            self.txss_mode.raw(),
            self.brp_mode.raw(),
            self.max_cts_failure_thr,
            self.max_cts_failure_dense_thr,
            self.max_back_failure_thr,
            self.max_back_failure_dense_thr,
            0,
        ]);
        buf.extend_from_slice(&self.wrong_sector_bis_thr.to_le_bytes());
        buf.push(u8::from(self.long_term_enable));
        buf.push(u8::from(self.long_term_update_thr));
        buf.extend_from_slice(&self.long_term_mbps_th_tbl);
        buf.push(0);
        for timeout in self.long_term_trig_timeout_per_mcs {
            buf.extend_from_slice(&timeout.to_le_bytes());
        }
        buf.extend_from_slice(&[0, 0]);
        buf
    }
}

struct EventReader<'a> {
    event_id: u16,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> EventReader<'a> {
    fn new(event: &'a WmiEvent, size: usize) -> Result<Self, WmiError> {
        if event.payload.len() < size {
            return Err(WmiError::ShortEvent {
                event_id: event.id,
                expected: size,
                actual: event.payload.len(),
            });
        }
        Ok(Self {
            event_id: event.id,
            buf: &event.payload,
            pos: 0,
        })
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WmiError> {
        let end = self.pos.saturating_add(len);
        let bytes = self.buf.get(self.pos..end).ok_or(WmiError::ShortEvent {
            event_id: self.event_id,
            expected: end,
            actual: self.buf.len(),
        })?;
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], WmiError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, WmiError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, WmiError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, WmiError> {
        Ok(u32::from_le_bytes(self.array()?))
    }
}

fn status_byte(event: &WmiEvent, table: StatusTable) -> Result<(FwStatus, ()), WmiError> {
    let mut reader = EventReader::new(event, 4)?;
    Ok((table.map(u32::from(reader.u8()?)), ()))
}

impl WmiClient<'_> {
    fn complete<T>(
        &self,
        cmd_id: u16,
        payload: &[u8],
        event_id: u16,
        accept: impl Fn(&WmiEvent) -> bool,
        parse: impl FnOnce(&WmiEvent) -> Result<(FwStatus, T), WmiError>,
    ) -> Result<Completion<T>, WmiError> {
        let is_completion = |event: &WmiEvent| event.ring == Ring::Rx && event.id == event_id && accept(event);
        let events = self.call_until(cmd_id, payload, &is_completion)?;
        let Some(event) = events.iter().find(|event| is_completion(event)) else {
            warn!("{}: no event {event_id:#x} for command {cmd_id:#x}", self.radio().name());
            return Ok(Completion::EventNotFound(event_id));
        };
        let (status, value) = parse(event)?;
        if status.is_success() {
            Ok(Completion::Completed(value))
        } else {
            warn!("{}: command {cmd_id:#x} rejected: {status}", self.radio().name());
            Ok(Completion::Rejected(status))
        }
    }

    /// Round-trip `payload` through the firmware echo service.
    pub fn echo(&self, payload: &[u8]) -> Result<Completion<Vec<u8>>, WmiError> {
        self.complete(WMI_ECHO_CMDID, payload, WMI_ECHO_RSP_EVENTID, |_| true, |event| {
            Ok((FwStatus::Success, event.payload.clone()))
        })
    }

    /// Apply a rate search configuration; the event must echo `cfg.cid`.
    pub fn rs_cfg(&self, cfg: &RsCfg) -> Result<Completion<RsCfg>, WmiError> {
        let cid = cfg.cid;
        self.complete(
            WMI_RS_CFG_CMDID,
            &cfg.encode(),
            WMI_RS_CFG_DONE_EVENTID,
            |event| event.payload.first() == Some(&cid),
            |event| {
                let mut reader = EventReader::new(event, 4)?;
                let _cid = reader.u8()?;
                Ok((StatusTable::Firmware.map(u32::from(reader.u8()?)), cfg.clone()))
            },
        )
    }

    /// Fetch detailed rate search statistics for `cid`.
    pub fn get_detailed_rs_res(&self, cid: u8) -> Result<Completion<RsResults>, WmiError> {
        self.complete(
            WMI_GET_DETAILED_RS_RES_CMDID,
            &[cid, 0, 0, 0],
            WMI_GET_DETAILED_RS_RES_EVENTID,
            |_| true,
            |event| {
                let mut reader = EventReader::new(event, 36)?;
                let cid = reader.u8()?;
                let status = StatusTable::Firmware.map(u32::from(reader.u8()?));
                let results = RsResults {
                    cid,
                    num_of_tx_pkt: reader.array()?,
                    num_of_non_acked_pkt: reader.array()?,
                    tsf: reader.u32()?,
                    mcs: reader.u8()?,
                };
                Ok((status, results))
            },
        )
    }

    /// Measure the angle of arrival from `peer`.
    pub fn aoa_meas(
        &self,
        peer: MacAddr,
        channel: u8,
        meas_type: AoaMeasType,
        rf_mask: u32,
    ) -> Result<Completion<AoaMeasurement>, WmiError> {
        let mut cmd = Vec::with_capacity(12);
        cmd.extend_from_slice(&peer.octets());
        cmd.extend_from_slice(&[channel, meas_type.raw()]);
        cmd.extend_from_slice(&rf_mask.to_le_bytes());
        self.complete(WMI_AOA_MEAS_CMDID, &cmd, WMI_AOA_MEAS_EVENTID, |_| true, |event| {
            let mut reader = EventReader::new(event, 16)?;
            let peer = MacAddr(reader.array()?);
            let channel = reader.u8()?;
            let meas_type = reader.u8()?;
            let rf_mask = reader.u32()?;
            let status = StatusTable::AoaMeas.map(u32::from(reader.u8()?));
            let _reserved = reader.u8()?;
            let length = usize::from(reader.u16()?).min(WMI_AOA_MAX_DATA_SIZE);
            let mut samples = Vec::new();
            if status.is_success() {
                let data = reader.take(length)?;
                samples = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
            }
            Ok((
                status,
                AoaMeasurement {
                    peer,
                    channel,
                    meas_type,
                    rf_mask,
                    samples,
                },
            ))
        })
    }

    /// Select the device power save profile.
    pub fn ps_dev_profile_cfg(&self, profile: PsProfile) -> Result<Completion<PsProfile>, WmiError> {
        self.complete(
            WMI_PS_DEV_PROFILE_CFG_CMDID,
            &[profile.raw(), 0, 0, 0],
            WMI_PS_DEV_PROFILE_CFG_EVENTID,
            |_| true,
            |event| {
                let mut reader = EventReader::new(event, 4)?;
                Ok((StatusTable::BadParam.map(reader.u32()?), profile))
            },
        )
    }

    /// Read the active power save profile.
    pub fn ps_dev_profile_cfg_read(&self) -> Result<Completion<PsProfile>, WmiError> {
        self.complete(
            WMI_PS_DEV_PROFILE_CFG_READ_CMDID,
            &[0; 4],
            WMI_PS_DEV_PROFILE_CFG_READ_EVENTID,
            |_| true,
            |event| {
                let mut reader = EventReader::new(event, 4)?;
                let raw = reader.u8()?;
                let profile = PsProfile::from_raw(raw).ok_or(WmiError::UnknownValue {
                    event_id: event.id,
                    field: "ps_profile",
                    value: u32::from(raw),
                })?;
                Ok((FwStatus::Success, profile))
            },
        )
    }

    /// Configure beamforming triggers and thresholds.
    pub fn bf_control(&self, control: &BfControl) -> Result<Completion<BfControl>, WmiError> {
        self.complete(
            WMI_BF_CONTROL_CMDID,
            &control.encode(),
            WMI_BF_CONTROL_EVENTID,
            |_| true,
            |event| {
                let (status, ()) = status_byte(event, StatusTable::Firmware)?;
                Ok((status, control.clone()))
            },
        )
    }

    /// Activate `sector` on the RF modules in `rf_modules`.
    pub fn set_rf_sector_on(
        &self,
        sector: u16,
        sector_type: SectorType,
        rf_modules: u8,
    ) -> Result<Completion<()>, WmiError> {
        let mut cmd = Vec::with_capacity(4);
        cmd.extend_from_slice(&sector.to_le_bytes());
        cmd.extend_from_slice(&[sector_type.raw(), rf_modules]);
        self.complete(
            WMI_SET_RF_SECTOR_ON_CMDID,
            &cmd,
            WMI_SET_RF_SECTOR_ON_DONE_EVENTID,
            |_| true,
            |event| status_byte(event, StatusTable::RfSector),
        )
    }

    /// Set the TX sector order; unused slots are filled with [`SECTOR_ORDER_END`].
    pub fn prio_tx_sectors_order(
        &self,
        order: &[u8],
        sweep: SweepType,
        cid: u8,
    ) -> Result<Completion<()>, WmiError> {
        if order.len() > MAX_NUM_OF_SECTORS {
            return Err(WmiError::TooLong {
                field: "tx_sectors_priority_array",
                len: order.len(),
                max: MAX_NUM_OF_SECTORS,
            });
        }
        let mut cmd = order.to_vec();
        cmd.resize(MAX_NUM_OF_SECTORS, SECTOR_ORDER_END);
        cmd.extend_from_slice(&[sweep.raw(), cid, 0, 0]);
        self.complete(
            WMI_PRIO_TX_SECTORS_ORDER_CMDID,
            &cmd,
            WMI_PRIO_TX_SECTORS_ORDER_EVENTID,
            |_| true,
            |event| status_byte(event, StatusTable::BadParam),
        )
    }

    /// Set how many sectors of the priority order are swept.
    pub fn prio_tx_sectors_number(&self, beacon: u8, txss: u8, cid: u8) -> Result<Completion<()>, WmiError> {
        self.complete(
            WMI_PRIO_TX_SECTORS_NUMBER_CMDID,
            &[beacon, txss, cid, 0],
            WMI_PRIO_TX_SECTORS_NUMBER_EVENTID,
            |_| true,
            |event| status_byte(event, StatusTable::BadParam),
        )
    }

    /// Restore the board file sector order and count.
    pub fn prio_tx_sectors_default_cfg(&self, sweep: SweepType, cid: u8) -> Result<Completion<()>, WmiError> {
        self.complete(
            WMI_PRIO_TX_SECTORS_SET_DEFAULT_CFG_CMDID,
            &[sweep.raw(), cid, 0, 0],
            WMI_PRIO_TX_SECTORS_SET_DEFAULT_CFG_EVENTID,
            |_| true,
            |event| status_byte(event, StatusTable::BadParam),
        )
    }

    /// Select the silent RSSI calibration table; yields the table the
    /// firmware reports as active.
    pub fn set_active_silent_rssi_table(&self, table: SilentRssiTable) -> Result<Completion<u32>, WmiError> {
        self.complete(
            WMI_SET_ACTIVE_SILENT_RSSI_TABLE_CMDID,
            &table.raw().to_le_bytes(),
            WMI_SET_SILENT_RSSI_TABLE_DONE_EVENTID,
            |_| true,
            |event| {
                let mut reader = EventReader::new(event, 8)?;
                let status = StatusTable::SilentRssi.map(reader.u32()?);
                Ok((status, reader.u32()?))
            },
        )
    }

    /// Restrict TXSS and beacon sweeps to `sectors`, in that order.
    pub fn select_enabled_tx_sectors(&self, sectors: &[u8], cid: u8) -> Result<Completion<()>, WmiError> {
        let count = u8::try_from(sectors.len())
            .ok()
            .filter(|n| usize::from(*n) <= MAX_NUM_OF_SECTORS)
            .ok_or(WmiError::TooLong {
                field: "sectors",
                len: sectors.len(),
                max: MAX_NUM_OF_SECTORS,
            })?;
        match self.prio_tx_sectors_order(sectors, SweepType::TxssAndBeacon, cid)? {
            Completion::Completed(()) => self.prio_tx_sectors_number(count, count, cid),
            other => Ok(other),
        }
    }
}
