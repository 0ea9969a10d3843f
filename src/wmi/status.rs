// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Map firmware completion status codes to named outcomes.
// Author: Lukas Bower

use std::fmt;

use serde::Serialize;

/// Named firmware completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FwStatus {
    /// Command applied.
    Success,
    /// Firmware rejected the parameters.
    BadParameters,
    /// Firmware is busy with another operation.
    Busy,
    /// Operation not supported by firmware or peer.
    NotSupported,
    /// Any other nonzero code.
    Failure(u32),
}

impl FwStatus {
    /// True for [`FwStatus::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for FwStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::BadParameters => f.write_str("bad parameters"),
            Self::Busy => f.write_str("busy"),
            Self::NotSupported => f.write_str("not supported"),
            Self::Failure(code) => write!(f, "failure ({code:#x})"),
        }
    }
}

/// Status code enumeration used by a completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTable {
    /// `wmi_rf_sector_status`: 0 ok, 1 bad parameters, 2 busy, 3 not supported.
    RfSector,
    /// `wmi_fw_status`: 0 ok, anything else failed.
    Firmware,
    /// Sector priority and power save commands: 0 ok, 1 bad parameters.
    BadParam,
    /// `wmi_silent_rssi_status`: 0 ok, anything else failed.
    SilentRssi,
    /// `wmi_aoa_meas_status`: 0 ok, 1 peer incapable.
    AoaMeas,
}

impl StatusTable {
    /// Name a raw status code.
    #[must_use]
    pub fn map(self, code: u32) -> FwStatus {
        match (self, code) {
            (_, 0) => FwStatus::Success,
            (Self::RfSector | Self::BadParam, 1) => FwStatus::BadParameters,
            (Self::RfSector, 2) => FwStatus::Busy,
            (Self::RfSector, 3) | (Self::AoaMeas, 1) => FwStatus::NotSupported,
            (_, other) => FwStatus::Failure(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rf_sector_codes() {
        let table = StatusTable::RfSector;
        assert_eq!(table.map(0), FwStatus::Success);
        assert_eq!(table.map(1), FwStatus::BadParameters);
        assert_eq!(table.map(2), FwStatus::Busy);
        assert_eq!(table.map(3), FwStatus::NotSupported);
        assert_eq!(table.map(4), FwStatus::Failure(4));
    }

    #[test]
    fn tables_differ_on_code_one() {
        assert_eq!(StatusTable::Firmware.map(1), FwStatus::Failure(1));
        assert_eq!(StatusTable::BadParam.map(1), FwStatus::BadParameters);
        assert_eq!(StatusTable::BadParam.map(2), FwStatus::Failure(2));
        assert_eq!(StatusTable::SilentRssi.map(1), FwStatus::Failure(1));
        assert_eq!(StatusTable::AoaMeas.map(1), FwStatus::NotSupported);
        assert_eq!(StatusTable::AoaMeas.map(2), FwStatus::Failure(2));
    }
}
