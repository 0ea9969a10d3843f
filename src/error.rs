// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Aggregate the module errors of the radio control core.
// Author: Lukas Bower

use nla_codec::NlaError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::exec::ExecError;
use crate::mac::MacError;
use crate::sector::SectorError;
use crate::vendor::TransportError;
use crate::wmi::WmiError;

/// Any hard failure of a radio control operation.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Attribute policy or codec failure.
    #[error(transparent)]
    Nla(#[from] NlaError),
    /// Sector settings out of range.
    #[error(transparent)]
    Sector(#[from] SectorError),
    /// External process failure.
    #[error(transparent)]
    Exec(#[from] ExecError),
    /// Vendor command failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// WMI command failure.
    #[error(transparent)]
    Wmi(#[from] WmiError),
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Malformed MAC address.
    #[error(transparent)]
    Mac(#[from] MacError),
}
