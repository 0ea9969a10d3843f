// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Issue NLA-encoded vendor commands through the iw command channel.
// Author: Lukas Bower

//! Vendor command transport.
//!
//! A request [`Dataset`] is encoded with the attribute policy, piped into
//! `iw dev <iface> vendor recv <oui> <cmd> -`, and the hex dump printed by
//! `iw` is decoded with the same policy.

use std::time::Duration;

use log::{debug, error, info};
use nla_codec::{decode, encode, Dataset, Decoded, NlaError, Policy};
use thiserror::Error;

use crate::exec::{CommandRunner, ExecError};
use crate::hexdump::{self, HexdumpError};
use crate::radio::RadioHandle;

/// Qualcomm Atheros OUI used for every vendor command.
pub const QCA_VENDOR_OUI: &str = "0x001374";

/// Attribute logged with each response for trace correlation.
pub const TSF_ATTRIBUTE: &str = "QCA_ATTR_TSF";

/// Vendor command failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be encoded.
    #[error("encode request for vendor command {command_id:#x}: {source}")]
    Encode {
        /// Vendor subcommand.
        command_id: u32,
        /// Codec failure.
        #[source]
        source: NlaError,
    },
    /// Response could not be decoded.
    #[error("decode response of vendor command {command_id:#x}: {source}")]
    Decode {
        /// Vendor subcommand.
        command_id: u32,
        /// Codec failure.
        #[source]
        source: NlaError,
    },
    /// Response text could not be scanned for hex digits.
    #[error("scan response of vendor command {command_id:#x}: {source}")]
    Hexdump {
        /// Vendor subcommand.
        command_id: u32,
        /// Scanner failure.
        #[source]
        source: HexdumpError,
    },
    /// Command channel exceeded its time bound and was killed.
    #[error("vendor command {command_id:#x} on {iface} timed out after {timeout:?}")]
    Timeout {
        /// Interface name.
        iface: String,
        /// Vendor subcommand.
        command_id: u32,
        /// Configured bound.
        timeout: Duration,
    },
    /// Command channel exited with a failure status.
    #[error("vendor command {command_id:#x} on {iface} failed ({status:?}): {stderr}")]
    Failure {
        /// Interface name.
        iface: String,
        /// Vendor subcommand.
        command_id: u32,
        /// Exit code, `None` when killed by a signal.
        status: Option<i32>,
        /// Diagnostic output.
        stderr: String,
    },
    /// Command channel could not be run.
    #[error(transparent)]
    Exec(ExecError),
    /// Response lacks an attribute the caller requires.
    #[error("vendor command {command_id:#x} response lacks {name}")]
    MissingAttribute {
        /// Vendor subcommand.
        command_id: u32,
        /// Policy name of the attribute.
        name: String,
    },
}

/// One radio's vendor command channel.
#[derive(Clone, Copy)]
pub struct VendorTransport<'a> {
    runner: &'a dyn CommandRunner,
    iw_path: &'a str,
    iface: &'a str,
    timeout: Duration,
}

impl<'a> VendorTransport<'a> {
    /// Channel for `iface` using an explicit runner and bound.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, iw_path: &'a str, iface: &'a str, timeout: Duration) -> Self {
        Self {
            runner,
            iw_path,
            iface,
            timeout,
        }
    }

    /// Channel configured from a radio handle.
    #[must_use]
    pub fn for_radio(radio: &'a RadioHandle) -> Self {
        Self::new(
            radio.runner(),
            &radio.settings().iw_path,
            radio.iface(),
            radio.settings().vendor_timeout,
        )
    }

    /// Interface the channel talks to.
    #[must_use]
    pub fn iface(&self) -> &str {
        self.iface
    }

    /// Encode `request`, run the vendor command and decode its response.
    pub fn issue(&self, command_id: u32, request: &Dataset, policy: &Policy) -> Result<Decoded, TransportError> {
        info!("vendor command {command_id:#x} on {}", self.iface);
        let payload = encode(request, policy).map_err(|source| TransportError::Encode { command_id, source })?;
        let args = vec![
            "dev".to_owned(),
            self.iface.to_owned(),
            "vendor".to_owned(),
            "recv".to_owned(),
            QCA_VENDOR_OUI.to_owned(),
            format!("{command_id:#x}"),
            "-".to_owned(),
        ];
        debug!("invoking {} {} <<< {}", self.iw_path, args.join(" "), hex::encode(&payload));

        let output = match self.runner.run(self.iw_path, &args, &payload, self.timeout) {
            Ok(output) => output,
            Err(ExecError::TimedOut { timeout, .. }) => {
                error!("vendor command {command_id:#x} on {} timed out", self.iface);
                return Err(TransportError::Timeout {
                    iface: self.iface.to_owned(),
                    command_id,
                    timeout,
                });
            }
            Err(err) => {
                error!("vendor command {command_id:#x} on {}: {err}", self.iface);
                return Err(TransportError::Exec(err));
            }
        };
        if !output.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            error!("vendor command {command_id:#x} on {} failed: {stderr}", self.iface);
            return Err(TransportError::Failure {
                iface: self.iface.to_owned(),
                command_id,
                status: output.status,
                stderr,
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let stream = hexdump::scan(&text).map_err(|source| TransportError::Hexdump { command_id, source })?;
        let decoded = decode(&stream, policy).map_err(|source| TransportError::Decode { command_id, source })?;
        match decoded.get(TSF_ATTRIBUTE).and_then(|tsf| tsf.value_raw.as_deref()) {
            Some(tsf) => debug!("response with TSF {tsf}"),
            None => debug!("response without TSF"),
        }
        Ok(decoded)
    }
}

/// Fetch a scalar attribute the caller cannot do without.
pub fn required_scalar(decoded: &Decoded, command_id: u32, name: &str) -> Result<u64, TransportError> {
    decoded.scalar(name).ok_or_else(|| TransportError::MissingAttribute {
        command_id,
        name: name.to_owned(),
    })
}

/// Fetch a nested attribute the caller cannot do without.
pub fn required_nested<'d>(decoded: &'d Decoded, command_id: u32, name: &str) -> Result<&'d Decoded, TransportError> {
    decoded.nested(name).ok_or_else(|| TransportError::MissingAttribute {
        command_id,
        name: name.to_owned(),
    })
}
