// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Exercise node configuration loading, phy discovery and policy overrides.
// Author: Lukas Bower

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tpy_node::config::{ConfigError, NodeConfig, PolicySet};
use tpy_node::mock::{MemoryDebugFs, ScriptedRunner};
use tpy_node::radio::Correlation;

const NODE_TOML: &str = r#"
iw_path = "/usr/sbin/iw"
vendor_timeout_ms = 1500
wmi_timeout_ms = 800
correlation = "strict"

[[radio]]
name = "node-a"
iface = "wlan0"

[[radio]]
name = "node-b"
iface = "wlan1"
phy = "phy7"
"#;

#[test]
fn loads_file_and_discovers_phy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("node.toml");
    fs::write(&path, NODE_TOML).expect("write");

    let config = NodeConfig::load(&path).expect("load");
    let settings = config.settings();
    assert_eq!(settings.iw_path, "/usr/sbin/iw");
    assert_eq!(settings.vendor_timeout, Duration::from_millis(1500));
    assert_eq!(settings.wmi_poll, Duration::from_millis(20));
    assert_eq!(settings.correlation, Correlation::Strict);

    let sysfs = Arc::new(MemoryDebugFs::new());
    sysfs.set("/sys/class/net/wlan0/phy80211/name", "phy1\n");
    let radios = config
        .build_radios(sysfs, Arc::new(ScriptedRunner::new()))
        .expect("radios");

    assert_eq!(radios.len(), 2);
    assert_eq!(radios[0].debugfs_dir(), Path::new("/sys/kernel/debug/ieee80211/phy1"));
    assert_eq!(radios[1].debugfs_dir(), Path::new("/sys/kernel/debug/ieee80211/phy7"));
    assert_eq!(radios[1].settings().wmi_timeout, Duration::from_millis(800));
}

#[test]
fn missing_phy_entry_is_reported() {
    let config = NodeConfig::from_toml(NODE_TOML).expect("parse");
    let entry = config.radio("node-a").expect("entry");

    let err = config.debugfs_dir(entry, &MemoryDebugFs::new()).expect_err("no sysfs entry");

    assert!(matches!(err, ConfigError::PhyDiscovery { ref iface, .. } if iface == "wlan0"));
    assert!(matches!(config.radio("node-z"), Err(ConfigError::UnknownRadio(_))));
}

#[test]
fn rejects_inconsistent_values() {
    assert!(matches!(
        NodeConfig::from_toml("wmi_timeout_ms = 10\nwmi_poll_ms = 50\n"),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(NodeConfig::from_toml("vendor_timeout_ms = 0\n"), Err(ConfigError::Invalid(_))));
    assert!(matches!(NodeConfig::from_toml("correlation = \"eager\"\n"), Err(ConfigError::Parse(_))));
    assert!(matches!(NodeConfig::load(Path::new("/nonexistent/node.toml")), Err(ConfigError::Read { .. })));
}

#[test]
fn policy_override_replaces_packaged_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let schema = dir.path().join("policy.json");
    fs::write(
        &schema,
        r#"[{"name": "QCA_ATTR_DMG_RF_SECTOR_INDEX", "nla_type": 40, "nla_len": 2, "data_type": "U16"}]"#,
    )
    .expect("write");
    let config = NodeConfig {
        policy: Some(schema.clone()),
        ..NodeConfig::default()
    };

    let policies = config.policy_set().expect("override");
    assert_eq!(policies.rf_sector().len(), 1);
    assert_eq!(policies.rf_sector().get("QCA_ATTR_DMG_RF_SECTOR_INDEX").map(|s| s.nla_type()), Some(40));

    fs::write(&schema, r#"[{"name": "X", "nla_type": 1, "data_type": "NLA_STRING"}]"#).expect("write");
    assert!(matches!(PolicySet::from_path(&schema), Err(ConfigError::Policy { .. })));
}
