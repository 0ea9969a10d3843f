// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Exercise sector configuration and codebook access over vendor commands.
// Author: Lukas Bower

use std::sync::Arc;

use tpy_node::config::PolicySet;
use tpy_node::mac::MacAddr;
use tpy_node::mock::{MemoryDebugFs, ScriptedReply, ScriptedRunner};
use tpy_node::nla_codec::{decode, encode, Dataset, Policy};
use tpy_node::radio::RadioHandle;
use tpy_node::rfantenna::{RfAntenna, SectorFilter, GET_SECTOR_CFG, SET_SECTOR_CFG};
use tpy_node::sector::{encode_sector_config, SectorConfig, SectorRegisters, SectorType};
use tpy_node::vendor::TransportError;
use tpy_node::NodeError;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> (RadioHandle, Arc<ScriptedRunner>, PolicySet) {
    init_logging();
    let runner = Arc::new(ScriptedRunner::new());
    let radio = RadioHandle::new(
        "node-a",
        "wlan0",
        "/sys/kernel/debug/ieee80211/phy0",
        Arc::new(MemoryDebugFs::new()),
        runner.clone(),
    );
    (radio, runner, PolicySet::packaged().expect("policy"))
}

fn sector_reply(policy: &Policy, registers: &SectorRegisters) -> ScriptedReply {
    let module = Dataset::new()
        .with("QCA_ATTR_DMG_RF_SECTOR_CFG_MODULE_INDEX", 0u8)
        .with("QCA_ATTR_DMG_RF_SECTOR_CFG_ETYPE0", registers.etype0)
        .with("QCA_ATTR_DMG_RF_SECTOR_CFG_ETYPE1", registers.etype1)
        .with("QCA_ATTR_DMG_RF_SECTOR_CFG_ETYPE2", registers.etype2)
        .with("QCA_ATTR_DMG_RF_SECTOR_CFG_PSH_HI", registers.psh_hi)
        .with("QCA_ATTR_DMG_RF_SECTOR_CFG_PSH_LO", registers.psh_lo)
        .with("QCA_ATTR_DMG_RF_SECTOR_CFG_DTYPE_X16", registers.dtype_x16);
    let response = Dataset::new().with(
        "QCA_ATTR_DMG_RF_SECTOR_CFG",
        Dataset::new().with("QCA_ATTR_DMG_RF_SECTOR_CFG_MODULE_0", module),
    );
    ScriptedReply::stdout(hex::encode(encode(&response, policy).expect("encode")))
}

fn programmed_sector() -> SectorConfig {
    let mut config = SectorConfig::default();
    config.psh[0] = 3;
    config.psh[31] = 1;
    config.etype[5] = 6;
    config.dtype[2] = 4;
    config.x16 = 0x11;
    config
}

#[test]
fn get_sector_config_reads_module_zero() {
    let (radio, runner, policies) = setup();
    let registers = SectorRegisters {
        psh_hi: 1,
        psh_lo: 2,
        etype0: 3,
        etype1: 4,
        etype2: 5,
        dtype_x16: 0x1100_0006,
    };
    runner.push(sector_reply(policies.rf_sector(), &registers));

    let read = RfAntenna::new(&radio, policies.rf_sector())
        .get_sector_config(SectorType::Rx, 12)
        .expect("read");

    assert_eq!(read, registers);
    let invocation = &runner.invocations()[0];
    assert_eq!(invocation.args[5], format!("{GET_SECTOR_CFG:#x}"));
    let request = decode(&invocation.stdin, policies.rf_sector()).expect("request");
    assert_eq!(request.scalar("QCA_ATTR_DMG_RF_SECTOR_INDEX"), Some(12));
    assert_eq!(request.scalar("QCA_ATTR_DMG_RF_SECTOR_TYPE"), Some(0));
    assert_eq!(request.scalar("QCA_ATTR_DMG_RF_MODULE_MASK"), Some(1));
}

#[test]
fn set_tx_sector_sends_packed_registers() {
    let (radio, runner, policies) = setup();
    runner.push(ScriptedReply::stdout(""));
    let config = programmed_sector();

    RfAntenna::new(&radio, policies.rf_sector())
        .set_rf_tx_sector_config(40, &config)
        .expect("program");

    let invocation = &runner.invocations()[0];
    assert_eq!(invocation.args[5], format!("{SET_SECTOR_CFG:#x}"));
    let request = decode(&invocation.stdin, policies.rf_sector()).expect("request");
    assert_eq!(request.scalar("QCA_ATTR_DMG_RF_SECTOR_TYPE"), Some(1));
    let module = request
        .nested("QCA_ATTR_DMG_RF_SECTOR_CFG")
        .and_then(|modules| modules.nested("QCA_ATTR_DMG_RF_SECTOR_CFG_MODULE_0"))
        .expect("module 0");
    let expected = encode_sector_config(&config).expect("registers");
    assert_eq!(module.scalar("QCA_ATTR_DMG_RF_SECTOR_CFG_MODULE_INDEX"), Some(0));
    assert_eq!(module.scalar("QCA_ATTR_DMG_RF_SECTOR_CFG_PSH_LO"), Some(u64::from(expected.psh_lo)));
    assert_eq!(module.scalar("QCA_ATTR_DMG_RF_SECTOR_CFG_ETYPE2"), Some(u64::from(expected.etype2)));
    assert_eq!(module.scalar("QCA_ATTR_DMG_RF_SECTOR_CFG_DTYPE_X16"), Some(u64::from(expected.dtype_x16)));
}

#[test]
fn invalid_sector_settings_are_rejected_before_sending() {
    let (radio, runner, policies) = setup();
    let mut config = programmed_sector();
    config.psh[4] = 4;

    let err = RfAntenna::new(&radio, policies.rf_sector())
        .set_rf_rx_sector_config(1, &config)
        .expect_err("psh out of range");

    assert!(matches!(err, NodeError::Sector(_)));
    assert!(runner.invocations().is_empty());
}

#[test]
fn codebook_skips_unprogrammed_sectors_by_default() {
    let (radio, runner, policies) = setup();
    let programmed = encode_sector_config(&programmed_sector()).expect("registers");
    let mut zeroed = SectorConfig::default();
    zeroed.psh[7] = 2;
    let zeroed = encode_sector_config(&zeroed).expect("registers");
    for registers in [&programmed, &zeroed, &programmed] {
        runner.push(sector_reply(policies.rf_sector(), registers));
    }

    let codebook = RfAntenna::new(&radio, policies.rf_sector())
        .get_rf_tx_sector_codebook(3, true)
        .expect("codebook");

    assert_eq!(codebook.iter().map(|entry| entry.sid).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(codebook[0].config, programmed_sector());
}

struct KeepAll;

impl SectorFilter for KeepAll {
    fn is_programmed(&self, _sid: u16, _config: &SectorConfig) -> bool {
        true
    }
}

#[test]
fn codebook_filter_is_overridable() {
    let (radio, runner, policies) = setup();
    let zeroed = SectorRegisters::default();
    runner.push(sector_reply(policies.rf_sector(), &zeroed));
    runner.push(sector_reply(policies.rf_sector(), &zeroed));

    let codebook = RfAntenna::new(&radio, policies.rf_sector())
        .with_filter(KeepAll)
        .get_rf_tx_sector_codebook(2, true)
        .expect("codebook");

    assert_eq!(codebook.len(), 2);
}

#[test]
fn codebook_write_programs_each_entry() {
    let (radio, runner, policies) = setup();
    let (programmed, zeroed) = (programmed_sector(), SectorConfig::default());
    runner.push(sector_reply(policies.rf_sector(), &encode_sector_config(&programmed).expect("registers")));
    runner.push(sector_reply(policies.rf_sector(), &encode_sector_config(&zeroed).expect("registers")));
    let antenna = RfAntenna::new(&radio, policies.rf_sector());
    let codebook = antenna.get_rf_tx_sector_codebook(2, false).expect("codebook");
    runner.push(ScriptedReply::stdout(""));
    runner.push(ScriptedReply::stdout(""));

    antenna.set_rf_tx_sector_codebook(&codebook).expect("program");

    let writes: Vec<_> = runner.invocations().into_iter().skip(2).collect();
    assert_eq!(writes.len(), 2);
    let second = decode(&writes[1].stdin, policies.rf_sector()).expect("request");
    assert_eq!(second.scalar("QCA_ATTR_DMG_RF_SECTOR_INDEX"), Some(1));
}

#[test]
fn selected_sector_round_trip() {
    let (radio, runner, policies) = setup();
    let policy = policies.rf_sector();
    let peer: MacAddr = "04:ce:14:0a:00:01".parse().expect("mac");
    let reply = Dataset::new().with("QCA_ATTR_DMG_RF_SECTOR_INDEX", 23u16);
    runner.push(ScriptedReply::stdout(hex::encode(encode(&reply, policy).expect("encode"))));
    runner.push(ScriptedReply::stdout(""));
    let antenna = RfAntenna::new(&radio, policy);

    assert_eq!(antenna.get_selected_sector(SectorType::Tx, peer).expect("get"), 23);
    antenna.set_selected_sector(SectorType::Tx, peer, 5).expect("set");

    let invocations = runner.invocations();
    let get = decode(&invocations[0].stdin, policy).expect("request");
    assert_eq!(get.get("QCA_ATTR_MAC_ADDR").map(|mac| mac.payload.clone()), Some(peer.octets().to_vec()));
    let set = decode(&invocations[1].stdin, policy).expect("request");
    assert_eq!(set.scalar("QCA_ATTR_DMG_RF_SECTOR_INDEX"), Some(5));
}

#[test]
fn missing_response_attribute_is_reported() {
    let (radio, runner, policies) = setup();
    runner.push(ScriptedReply::stdout(""));

    let err = RfAntenna::new(&radio, policies.rf_sector())
        .get_selected_sector(SectorType::Rx, MacAddr::default())
        .expect_err("no index");

    assert!(matches!(
        err,
        NodeError::Transport(TransportError::MissingAttribute { command_id: 0x8d, .. })
    ));
}
