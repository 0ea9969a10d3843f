// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Exercise vendor command invocation, response scanning and failure mapping.
// Author: Lukas Bower

use std::time::Duration;

use tpy_node::config::PolicySet;
use tpy_node::mock::{ScriptedReply, ScriptedRunner};
use tpy_node::nla_codec::{encode, Dataset, NlaError};
use tpy_node::vendor::{required_scalar, TransportError, VendorTransport};

const TIMEOUT: Duration = Duration::from_millis(500);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .chunks(8)
        .map(|line| line.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn request_goes_to_stdin_and_response_is_decoded() {
    init_logging();
    let policies = PolicySet::packaged().expect("policy");
    let policy = policies.rf_sector();
    let request = Dataset::new()
        .with("QCA_ATTR_DMG_RF_SECTOR_TYPE", 1u8)
        .with("QCA_ATTR_MAC_ADDR", vec![0x04, 0xce, 0x14, 0x0a, 0x00, 0x01]);
    let response = Dataset::new()
        .with("QCA_ATTR_DMG_RF_SECTOR_INDEX", 17u16)
        .with("QCA_ATTR_TSF", 0x0102_0304_0506_0708u64);
    let runner = ScriptedRunner::new();
    runner.push(ScriptedReply::stdout(format!(
        "vendor response: \n{}\n",
        spaced_hex(&encode(&response, policy).expect("encode"))
    )));

    let transport = VendorTransport::new(&runner, "/usr/sbin/iw", "wlan0", TIMEOUT);
    let decoded = transport.issue(0x8d, &request, policy).expect("issue");

    assert_eq!(required_scalar(&decoded, 0x8d, "QCA_ATTR_DMG_RF_SECTOR_INDEX").expect("index"), 17);
    assert_eq!(
        decoded.get("QCA_ATTR_TSF").and_then(|tsf| tsf.value_raw.as_deref()),
        Some("0102030405060708")
    );
    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].program, "/usr/sbin/iw");
    assert_eq!(
        invocations[0].args,
        ["dev", "wlan0", "vendor", "recv", "0x001374", "0x8d", "-"]
    );
    assert_eq!(invocations[0].stdin, encode(&request, policy).expect("encode"));
    assert_eq!(invocations[0].timeout, TIMEOUT);
}

#[test]
fn empty_response_is_empty_mapping() {
    let policies = PolicySet::packaged().expect("policy");
    let runner = ScriptedRunner::new();
    runner.push(ScriptedReply::stdout(""));

    let decoded = VendorTransport::new(&runner, "iw", "wlan0", TIMEOUT)
        .issue(0x8c, &Dataset::new(), policies.rf_sector())
        .expect("issue");

    assert!(decoded.is_empty());
    assert!(matches!(
        required_scalar(&decoded, 0x8c, "QCA_ATTR_TSF"),
        Err(TransportError::MissingAttribute { command_id: 0x8c, .. })
    ));
}

#[test]
fn timeout_and_failure_are_fatal() {
    init_logging();
    let policies = PolicySet::packaged().expect("policy");
    let runner = ScriptedRunner::new();
    runner.push(ScriptedReply::TimedOut);
    runner.push(ScriptedReply::failure(1, "command failed: No such device (-19)\n"));
    let transport = VendorTransport::new(&runner, "iw", "wlan9", TIMEOUT);

    match transport.issue(0x8b, &Dataset::new(), policies.rf_sector()) {
        Err(TransportError::Timeout { iface, command_id, timeout }) => {
            assert_eq!((iface.as_str(), command_id, timeout), ("wlan9", 0x8b, TIMEOUT));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    match transport.issue(0x8b, &Dataset::new(), policies.rf_sector()) {
        Err(TransportError::Failure { status, stderr, .. }) => {
            assert_eq!(status, Some(1));
            assert_eq!(stderr, "command failed: No such device (-19)");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn unknown_request_attribute_never_reaches_the_channel() {
    let policies = PolicySet::packaged().expect("policy");
    let runner = ScriptedRunner::new();
    let request = Dataset::new().with("QCA_ATTR_NOT_THERE", 1u8);

    let err = VendorTransport::new(&runner, "iw", "wlan0", TIMEOUT)
        .issue(0x8b, &request, policies.rf_sector())
        .expect_err("unknown attribute");

    assert!(matches!(
        err,
        TransportError::Encode {
            source: NlaError::UnknownAttribute(_),
            ..
        }
    ));
    assert!(runner.invocations().is_empty());
}

#[test]
fn malformed_response_is_a_frame_error() {
    let policies = PolicySet::packaged().expect("policy");
    let runner = ScriptedRunner::new();
    runner.push(ScriptedReply::stdout("08 00 1e 00 11 00"));

    let err = VendorTransport::new(&runner, "iw", "wlan0", TIMEOUT)
        .issue(0x8d, &Dataset::new(), policies.rf_sector())
        .expect_err("overrun");

    assert!(matches!(
        err,
        TransportError::Decode {
            source: NlaError::Frame(_),
            ..
        }
    ));
}
