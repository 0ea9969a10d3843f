// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Property tests for the sector register codec.
// Author: Lukas Bower

use proptest::collection::vec;
use proptest::prelude::*;

use tpy_node::sector::{
    decode_sector_config, encode_sector_config, CodebookEntry, SectorConfig, SectorRegisters, DTYPE_ENTRIES,
    ETYPE_ENTRIES, PSH_ENTRIES,
};

fn sector_config() -> impl Strategy<Value = SectorConfig> {
    (
        vec(0u8..=3, PSH_ENTRIES),
        vec(0u8..=7, ETYPE_ENTRIES),
        vec(0u8..=7, DTYPE_ENTRIES),
        any::<u8>(),
    )
        .prop_map(|(psh, etype, dtype, x16)| SectorConfig { psh, etype, dtype, x16 })
}

proptest! {
    #[test]
    fn settings_survive_register_round_trip(config in sector_config()) {
        let registers = encode_sector_config(&config).expect("valid settings");
        prop_assert_eq!(decode_sector_config(&registers), config);
    }

    #[test]
    fn registers_survive_settings_round_trip(
        psh_hi in any::<u32>(),
        psh_lo in any::<u32>(),
        etype0 in any::<u32>(),
        etype1 in any::<u32>(),
        etype2 in any::<u32>(),
        dtype in 0u32..(1 << 24),
        x16 in any::<u8>(),
    ) {
        let registers = SectorRegisters {
            psh_hi,
            psh_lo,
            etype0,
            etype1,
            etype2,
            dtype_x16: (u32::from(x16) << 24) | dtype,
        };
        let config = decode_sector_config(&registers);
        prop_assert_eq!(encode_sector_config(&config).expect("decoded settings"), registers);
    }
}

#[test]
fn concrete_register_examples() {
    let config = decode_sector_config(&SectorRegisters {
        psh_lo: 0x0000_0003,
        etype0: 0x1,
        etype2: 0x1,
        ..SectorRegisters::default()
    });
    assert_eq!(config.psh[0], 3);
    assert!(config.psh[1..].iter().all(|v| *v == 0));
    assert_eq!(config.etype[0], 0b101);
    assert!(config.etype[1..].iter().all(|v| *v == 0));
}

#[test]
fn codebook_entry_json_is_flat() {
    let entry = CodebookEntry {
        sid: 4,
        config: SectorConfig::default(),
    };
    let json = serde_json::to_value(&entry).expect("json");
    assert_eq!(json["sid"], 4);
    assert_eq!(json["psh"].as_array().map(Vec::len), Some(PSH_ENTRIES));
    let back: CodebookEntry = serde_json::from_value(json).expect("parse");
    assert_eq!(back, entry);
}
