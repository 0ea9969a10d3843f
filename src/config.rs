// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load and validate the node configuration and attribute policies.
// Author: Lukas Bower

//! Node configuration.
//!
//! ```toml
//! iw_path = "/usr/sbin/iw"
//! correlation = "strict"
//!
//! [[radio]]
//! name = "node-a"
//! iface = "wlan0"
//! ```
//!
//! Every key is optional except the radio `name` and `iface`.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use nla_codec::{NlaError, Policy};
use serde::Deserialize;
use thiserror::Error;

use crate::debugfs::DebugFs;
use crate::exec::CommandRunner;
use crate::radio::{Correlation, RadioHandle, RadioSettings};

/// Environment variable naming the default configuration file.
pub const CONFIG_ENV: &str = "TPYNODE_CONFIG";

const PACKAGED_RF_SECTOR_POLICY: &str = include_str!("../data/wil_rf_sector_policy.json");
const PACKAGED_ORIGIN: &str = "<packaged>";

/// Configuration could not be loaded or applied.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// TOML document is malformed.
    #[error("invalid node config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    /// Values are inconsistent.
    #[error("invalid node config: {0}")]
    Invalid(String),
    /// Attribute policy could not be built.
    #[error("attribute policy {origin}: {source}")]
    Policy {
        /// File path or `<packaged>`.
        origin: String,
        /// Schema failure.
        #[source]
        source: NlaError,
    },
    /// Interface has no wireless phy entry.
    #[error("cannot discover phy of {iface} from {}: {source}", path.display())]
    PhyDiscovery {
        /// Interface name.
        iface: String,
        /// Probed sysfs path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// No radio entry carries the requested name.
    #[error("no radio named {0} in the node config")]
    UnknownRadio(String),
}

/// One `[[radio]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadioEntry {
    /// Device name used in logs and batch reports.
    pub name: String,
    /// Network interface.
    pub iface: String,
    /// Wireless phy; discovered from sysfs when absent.
    #[serde(default)]
    pub phy: Option<String>,
}

/// Node-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// `iw` executable.
    #[serde(default = "default_iw_path")]
    pub iw_path: String,
    /// Vendor command bound in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub vendor_timeout_ms: u64,
    /// Strict correlation wait bound in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub wmi_timeout_ms: u64,
    /// Strict correlation mailbox poll interval in milliseconds.
    #[serde(default = "default_wmi_poll_ms")]
    pub wmi_poll_ms: u64,
    /// debugfs mount point.
    #[serde(default = "default_debugfs_root")]
    pub debugfs_root: PathBuf,
    /// Network interface sysfs directory used for phy discovery.
    #[serde(default = "default_sysfs_net_root")]
    pub sysfs_net_root: PathBuf,
    /// WMI event correlation mode.
    #[serde(default)]
    pub correlation: Correlation,
    /// Attribute policy override.
    #[serde(default)]
    pub policy: Option<PathBuf>,
    /// Radios controlled by this node.
    #[serde(default, rename = "radio")]
    pub radios: Vec<RadioEntry>,
}

fn default_iw_path() -> String {
    "iw".to_owned()
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_wmi_poll_ms() -> u64 {
    20
}

fn default_debugfs_root() -> PathBuf {
    PathBuf::from("/sys/kernel/debug")
}

fn default_sysfs_net_root() -> PathBuf {
    PathBuf::from("/sys/class/net")
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            iw_path: default_iw_path(),
            vendor_timeout_ms: default_timeout_ms(),
            wmi_timeout_ms: default_timeout_ms(),
            wmi_poll_ms: default_wmi_poll_ms(),
            debugfs_root: default_debugfs_root(),
            sysfs_net_root: default_sysfs_net_root(),
            correlation: Correlation::default(),
            policy: None,
            radios: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded node config from {}", path.display());
        Self::from_toml(&text)
    }

    /// Reject settings the radio stack cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iw_path.trim().is_empty() {
            return Err(ConfigError::Invalid("iw_path must not be empty".to_owned()));
        }
        if self.vendor_timeout_ms == 0 {
            return Err(ConfigError::Invalid("vendor_timeout_ms must be >= 1".to_owned()));
        }
        if self.wmi_timeout_ms == 0 {
            return Err(ConfigError::Invalid("wmi_timeout_ms must be >= 1".to_owned()));
        }
        if self.wmi_poll_ms == 0 || self.wmi_poll_ms > self.wmi_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "wmi_poll_ms {} must be within 1..={}",
                self.wmi_poll_ms, self.wmi_timeout_ms
            )));
        }
        let mut names = HashSet::new();
        for radio in &self.radios {
            if radio.name.is_empty() || radio.iface.is_empty() {
                return Err(ConfigError::Invalid("radio name and iface must not be empty".to_owned()));
            }
            if !names.insert(radio.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate radio name {}", radio.name)));
            }
        }
        Ok(())
    }

    /// Settings shared by every radio of the node.
    #[must_use]
    pub fn settings(&self) -> RadioSettings {
        RadioSettings {
            iw_path: self.iw_path.clone(),
            vendor_timeout: Duration::from_millis(self.vendor_timeout_ms),
            wmi_timeout: Duration::from_millis(self.wmi_timeout_ms),
            wmi_poll: Duration::from_millis(self.wmi_poll_ms),
            correlation: self.correlation,
        }
    }

    /// Radio entry named `name`.
    pub fn radio(&self, name: &str) -> Result<&RadioEntry, ConfigError> {
        self.radios
            .iter()
            .find(|radio| radio.name == name)
            .ok_or_else(|| ConfigError::UnknownRadio(name.to_owned()))
    }

    /// Phy debugfs directory of `entry`, reading
    /// `<sysfs_net_root>/<iface>/phy80211/name` through `fs` when no phy is
    /// configured.
    pub fn debugfs_dir(&self, entry: &RadioEntry, fs: &dyn DebugFs) -> Result<PathBuf, ConfigError> {
        let phy = match &entry.phy {
            Some(phy) => phy.clone(),
            None => {
                let path = self.sysfs_net_root.join(&entry.iface).join("phy80211").join("name");
                let raw = fs.read(&path).map_err(|source| ConfigError::PhyDiscovery {
                    iface: entry.iface.clone(),
                    path: path.clone(),
                    source,
                })?;
                let phy = String::from_utf8_lossy(&raw).trim().to_owned();
                debug!("{} is on {phy}", entry.iface);
                phy
            }
        };
        Ok(self.debugfs_root.join("ieee80211").join(phy))
    }

    /// Handle for `entry` sharing the given collaborators.
    pub fn build_radio(
        &self,
        entry: &RadioEntry,
        fs: Arc<dyn DebugFs>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<RadioHandle, ConfigError> {
        let dir = self.debugfs_dir(entry, fs.as_ref())?;
        Ok(RadioHandle::new(&entry.name, &entry.iface, dir, fs, runner).with_settings(self.settings()))
    }

    /// Handles for every configured radio.
    pub fn build_radios(
        &self,
        fs: Arc<dyn DebugFs>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Vec<RadioHandle>, ConfigError> {
        self.radios
            .iter()
            .map(|entry| self.build_radio(entry, Arc::clone(&fs), Arc::clone(&runner)))
            .collect()
    }

    /// Attribute policies, from `policy` when set, otherwise the packaged schema.
    pub fn policy_set(&self) -> Result<PolicySet, ConfigError> {
        match &self.policy {
            Some(path) => PolicySet::from_path(path),
            None => PolicySet::packaged(),
        }
    }
}

/// Attribute policies used by the vendor commands, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySet {
    rf_sector: Policy,
}

impl PolicySet {
    /// Policies from the schema embedded in the binary.
    pub fn packaged() -> Result<Self, ConfigError> {
        let rf_sector = Policy::from_json(PACKAGED_RF_SECTOR_POLICY).map_err(|source| ConfigError::Policy {
            origin: PACKAGED_ORIGIN.to_owned(),
            source,
        })?;
        Ok(Self { rf_sector })
    }

    /// Policies from a JSON schema file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let rf_sector = Policy::from_json(&text).map_err(|source| ConfigError::Policy {
            origin: path.display().to_string(),
            source,
        })?;
        Ok(Self { rf_sector })
    }

    /// Policy of the RF sector vendor commands.
    #[must_use]
    pub fn rf_sector(&self) -> &Policy {
        &self.rf_sector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_document() {
        let config = NodeConfig::from_toml("").expect("empty config");
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.settings(), RadioSettings::default());
    }

    #[test]
    fn packaged_policy_carries_sector_attributes() {
        let policies = PolicySet::packaged().expect("packaged policy");
        let policy = policies.rf_sector();
        assert_eq!(policy.get("QCA_ATTR_DMG_RF_SECTOR_INDEX").map(|spec| spec.nla_type()), Some(30));
        assert_eq!(policy.get("QCA_ATTR_MAC_ADDR").and_then(|spec| spec.nla_len()), Some(6));
        assert!(policy.get("QCA_ATTR_DMG_RF_SECTOR_CFG").is_some());
    }

    #[test]
    fn rejects_unknown_keys_and_duplicate_radios() {
        assert!(matches!(NodeConfig::from_toml("iw = \"x\""), Err(ConfigError::Parse(_))));
        let doc = "[[radio]]\nname = \"a\"\niface = \"wlan0\"\n[[radio]]\nname = \"a\"\niface = \"wlan1\"\n";
        assert!(matches!(NodeConfig::from_toml(doc), Err(ConfigError::Invalid(_))));
    }
}
