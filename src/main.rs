// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for node-side radio control.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! CLI entry point for node-side radio control.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::LevelFilter;
use serde::de::DeserializeOwned;
use serde::Serialize;

use tpy_node::batch::{self, BatchReport};
use tpy_node::config::{NodeConfig, PolicySet, CONFIG_ENV};
use tpy_node::debugfs::{DebugFs, SysDebugFs};
use tpy_node::exec::{CommandRunner, SystemRunner};
use tpy_node::mac::MacAddr;
use tpy_node::nla_codec::decode;
use tpy_node::radio::RadioHandle;
use tpy_node::rfantenna::{self, RfAntenna, DEFAULT_CODEBOOK_SECTORS};
use tpy_node::sector::{CodebookEntry, SectorConfig, SectorType};
use tpy_node::wmi::{
    ids, AoaMeasType, BfControl, Completion, PsProfile, RsCfg, SilentRssiTable, SweepType, WmiClient,
};
use tpy_node::NodeError;

/// Node-side radio control command-line arguments.
#[derive(Debug, Parser)]
#[command(author = "Lukas Bower", version, about = "Testbed node radio control", long_about = None)]
struct Cli {
    /// Node configuration TOML (defaults to $TPYNODE_CONFIG).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Restrict the command to one configured radio.
    #[arg(long, value_name = "NAME")]
    radio: Option<String>,

    /// Enable debug logging.
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read or program one antenna sector.
    #[command(subcommand)]
    Sector(SectorCommand),
    /// Read or program the TX sector codebook.
    #[command(subcommand)]
    Codebook(CodebookCommand),
    /// Read or force the sector selected towards a peer.
    #[command(subcommand)]
    Selected(SelectedCommand),
    /// Dump the WMI mailbox.
    Mailbox,
    /// Issue a firmware WMI command.
    #[command(subcommand)]
    Wmi(WmiCommand),
    /// Offline NLA helpers.
    #[command(subcommand)]
    Nla(NlaCommand),
}

#[derive(Debug, Args)]
struct SectorArgs {
    /// Sector direction.
    #[arg(long = "type", value_enum)]
    sector_type: SectorType,
    /// Sector index.
    #[arg(long)]
    index: u16,
}

#[derive(Debug, Subcommand)]
enum SectorCommand {
    /// Print the decoded sector settings.
    Get(SectorArgs),
    /// Program settings read from a JSON file.
    Set {
        #[command(flatten)]
        sector: SectorArgs,
        /// JSON sector settings `{psh, etype, dtype, x16}`.
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum CodebookCommand {
    /// Read TX sectors.
    Get {
        /// Number of sectors to read.
        #[arg(long, default_value_t = DEFAULT_CODEBOOK_SECTORS)]
        max: u16,
        /// Keep sectors whose amplifiers are all off.
        #[arg(long, default_value_t = false)]
        keep_invalid: bool,
    },
    /// Program TX sectors from a JSON codebook.
    Set {
        /// JSON array of `{sid, psh, etype, dtype, x16}`.
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum SelectedCommand {
    /// Print the sector used towards a peer.
    Get {
        /// Sector direction.
        #[arg(long = "type", value_enum)]
        sector_type: SectorType,
        /// Peer MAC address.
        #[arg(long)]
        peer: MacAddr,
    },
    /// Force the sector used towards a peer.
    Set {
        /// Sector direction.
        #[arg(long = "type", value_enum)]
        sector_type: SectorType,
        /// Peer MAC address.
        #[arg(long)]
        peer: MacAddr,
        /// Sector index.
        #[arg(long)]
        index: u16,
    },
}

#[derive(Debug, Subcommand)]
enum WmiCommand {
    /// Echo a hex payload through the firmware.
    Echo {
        /// Payload as hex digits.
        payload: String,
    },
    /// Apply the default rate search configuration.
    RsCfg {
        /// Connection id.
        #[arg(long, default_value_t = 0)]
        cid: u8,
        /// Disable rate search instead.
        #[arg(long, default_value_t = false)]
        disable: bool,
    },
    /// Read detailed rate search results.
    RsRes {
        /// Connection id.
        #[arg(long, default_value_t = 0)]
        cid: u8,
    },
    /// Apply a beamforming control JSON file.
    BfControl {
        /// JSON beamforming control settings.
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
    /// Switch an RF sector on.
    SectorOn {
        /// Sector index.
        #[arg(long)]
        sector: u16,
        /// Sector direction.
        #[arg(long = "type", value_enum)]
        sector_type: SectorType,
        /// RF module bit mask.
        #[arg(long, default_value_t = 0x01)]
        modules: u8,
    },
    /// Set the TX sector priority order.
    SectorOrder {
        /// Sweep the order applies to.
        #[arg(long, value_enum, default_value_t = SweepType::TxssAndBeacon)]
        sweep: SweepType,
        /// Connection id.
        #[arg(long, default_value_t = 0)]
        cid: u8,
        /// Sector indices, highest priority first.
        sectors: Vec<u8>,
    },
    /// Set how many prioritised sectors are swept.
    SectorNumber {
        /// Beacon sector count.
        #[arg(long)]
        beacon: u8,
        /// TXSS sector count.
        #[arg(long)]
        txss: u8,
        /// Connection id.
        #[arg(long, default_value_t = 0)]
        cid: u8,
    },
    /// Restore the default sector priority.
    SectorDefault {
        /// Sweep to reset.
        #[arg(long, value_enum, default_value_t = SweepType::TxssAndBeacon)]
        sweep: SweepType,
        /// Connection id.
        #[arg(long, default_value_t = 0)]
        cid: u8,
    },
    /// Restrict sweeps to the listed sectors.
    SelectSectors {
        /// Connection id.
        #[arg(long, default_value_t = 0)]
        cid: u8,
        /// Sector indices, highest priority first.
        sectors: Vec<u8>,
    },
    /// Read or set the power save profile.
    PsProfile {
        /// Profile to apply; read the active one when absent.
        #[arg(long, value_enum)]
        set: Option<PsProfile>,
    },
    /// Select the silent RSSI calibration table.
    SilentRssi {
        /// Table to activate.
        #[arg(value_enum)]
        table: SilentRssiTable,
    },
    /// Measure the angle of arrival from a peer.
    Aoa {
        /// Peer MAC address.
        #[arg(long)]
        peer: MacAddr,
        /// Channel index.
        #[arg(long, default_value_t = 0)]
        channel: u8,
        /// Measurement kind.
        #[arg(long, value_enum, default_value_t = AoaMeasType::Phase)]
        meas_type: AoaMeasType,
        /// RF chain mask.
        #[arg(long, default_value_t = 0)]
        rf_mask: u32,
    },
}

#[derive(Debug, Subcommand)]
enum NlaCommand {
    /// Decode a hex NLA stream with the RF sector policy.
    Decode {
        /// Stream as hex digits.
        hex: String,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn resolve_config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    if cli_path.is_some() {
        return cli_path;
    }
    env::var(CONFIG_ENV)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn load_config(cli_path: Option<PathBuf>) -> Result<NodeConfig> {
    match resolve_config_path(cli_path) {
        Some(path) => NodeConfig::load(&path)
            .with_context(|| format!("failed to load node config {}", path.display())),
        None => Ok(NodeConfig::default()),
    }
}

fn select_radios(config: &NodeConfig, name: Option<&str>) -> Result<Vec<RadioHandle>> {
    let fs: Arc<dyn DebugFs> = Arc::new(SysDebugFs);
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let radios = match name {
        Some(name) => vec![config.build_radio(config.radio(name)?, fs, runner)?],
        None => config.build_radios(fs, runner)?,
    };
    if radios.is_empty() {
        return Err(anyhow!("no radios configured; pass --config or set {CONFIG_ENV}"));
    }
    Ok(radios)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serialise output")?);
    Ok(())
}

fn completed<T>(result: Result<T, NodeError>) -> Result<Completion<T>, NodeError> {
    result.map(Completion::Completed)
}

fn wmi<T, F>(radios: &[RadioHandle], cmd_id: u16, op: F) -> BatchReport<T>
where
    T: Send,
    F: Fn(WmiClient<'_>) -> Result<Completion<T>, tpy_node::wmi::WmiError> + Sync,
{
    batch::run(radios, u32::from(cmd_id), |radio| Ok(op(WmiClient::new(radio))?))
}

fn report<T: Serialize>(report: &BatchReport<T>) -> Result<()> {
    print_json(report)?;
    if report.all_succeeded() {
        Ok(())
    } else {
        Err(anyhow!("{} radio(s) failed", report.failures.len()))
    }
}

fn run_wmi(radios: &[RadioHandle], command: WmiCommand) -> Result<()> {
    match command {
        WmiCommand::Echo { payload } => {
            let payload = hex::decode(payload.trim()).context("echo payload is not hex")?;
            report(&wmi(radios, ids::WMI_ECHO_CMDID, |client| {
                Ok(client.echo(&payload)?.map(hex::encode))
            }))
        }
        WmiCommand::RsCfg { cid, disable } => {
            let mut cfg = RsCfg::new(cid);
            cfg.rs_enable = !disable;
            report(&wmi(radios, ids::WMI_RS_CFG_CMDID, |client| client.rs_cfg(&cfg)))
        }
        WmiCommand::RsRes { cid } => report(&wmi(radios, ids::WMI_GET_DETAILED_RS_RES_CMDID, |client| {
            client.get_detailed_rs_res(cid)
        })),
        WmiCommand::BfControl { file } => {
            let control: BfControl = read_json(&file)?;
            report(&wmi(radios, ids::WMI_BF_CONTROL_CMDID, |client| client.bf_control(&control)))
        }
        WmiCommand::SectorOn {
            sector,
            sector_type,
            modules,
        } => report(&wmi(radios, ids::WMI_SET_RF_SECTOR_ON_CMDID, |client| {
            client.set_rf_sector_on(sector, sector_type, modules)
        })),
        WmiCommand::SectorOrder { sweep, cid, sectors } => {
            report(&wmi(radios, ids::WMI_PRIO_TX_SECTORS_ORDER_CMDID, |client| {
                client.prio_tx_sectors_order(&sectors, sweep, cid)
            }))
        }
        WmiCommand::SectorNumber { beacon, txss, cid } => {
            report(&wmi(radios, ids::WMI_PRIO_TX_SECTORS_NUMBER_CMDID, |client| {
                client.prio_tx_sectors_number(beacon, txss, cid)
            }))
        }
        WmiCommand::SectorDefault { sweep, cid } => {
            report(&wmi(radios, ids::WMI_PRIO_TX_SECTORS_SET_DEFAULT_CFG_CMDID, |client| {
                client.prio_tx_sectors_default_cfg(sweep, cid)
            }))
        }
        WmiCommand::SelectSectors { cid, sectors } => {
            report(&wmi(radios, ids::WMI_PRIO_TX_SECTORS_ORDER_CMDID, |client| {
                client.select_enabled_tx_sectors(&sectors, cid)
            }))
        }
        WmiCommand::PsProfile { set: Some(profile) } => {
            report(&wmi(radios, ids::WMI_PS_DEV_PROFILE_CFG_CMDID, |client| {
                client.ps_dev_profile_cfg(profile)
            }))
        }
        WmiCommand::PsProfile { set: None } => {
            report(&wmi(radios, ids::WMI_PS_DEV_PROFILE_CFG_READ_CMDID, |client| {
                client.ps_dev_profile_cfg_read()
            }))
        }
        WmiCommand::SilentRssi { table } => {
            report(&wmi(radios, ids::WMI_SET_ACTIVE_SILENT_RSSI_TABLE_CMDID, |client| {
                client.set_active_silent_rssi_table(table)
            }))
        }
        WmiCommand::Aoa {
            peer,
            channel,
            meas_type,
            rf_mask,
        } => report(&wmi(radios, ids::WMI_AOA_MEAS_CMDID, |client| {
            client.aoa_meas(peer, channel, meas_type, rf_mask)
        })),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config)?;
    let policies = config.policy_set().context("failed to load attribute policy")?;

    if let Command::Nla(NlaCommand::Decode { hex }) = &cli.command {
        let stream = hex::decode(hex.trim()).context("NLA stream is not hex")?;
        return print_json(&decode(&stream, policies.rf_sector())?);
    }

    let radios = select_radios(&config, cli.radio.as_deref())?;
    run(&radios, &policies, cli.command)
}

fn run(radios: &[RadioHandle], policies: &PolicySet, command: Command) -> Result<()> {
    let policy = policies.rf_sector();
    match command {
        Command::Sector(SectorCommand::Get(sector)) => {
            report(&batch::run(radios, rfantenna::GET_SECTOR_CFG, |radio| {
                let antenna = RfAntenna::new(radio, policy);
                completed(match sector.sector_type {
                    SectorType::Tx => antenna.get_rf_tx_sector_config(sector.index),
                    SectorType::Rx => antenna.get_rf_rx_sector_config(sector.index),
                })
            }))
        }
        Command::Sector(SectorCommand::Set { sector, file }) => {
            let config: SectorConfig = read_json(&file)?;
            report(&batch::run(radios, rfantenna::SET_SECTOR_CFG, |radio| {
                let antenna = RfAntenna::new(radio, policy);
                completed(match sector.sector_type {
                    SectorType::Tx => antenna.set_rf_tx_sector_config(sector.index, &config),
                    SectorType::Rx => antenna.set_rf_rx_sector_config(sector.index, &config),
                })
            }))
        }
        Command::Codebook(CodebookCommand::Get { max, keep_invalid }) => {
            report(&batch::run(radios, rfantenna::GET_SECTOR_CFG, |radio| {
                completed(RfAntenna::new(radio, policy).get_rf_tx_sector_codebook(max, !keep_invalid))
            }))
        }
        Command::Codebook(CodebookCommand::Set { file }) => {
            let codebook: Vec<CodebookEntry> = read_json(&file)?;
            report(&batch::run(radios, rfantenna::SET_SECTOR_CFG, |radio| {
                completed(RfAntenna::new(radio, policy).set_rf_tx_sector_codebook(&codebook))
            }))
        }
        Command::Selected(SelectedCommand::Get { sector_type, peer }) => {
            report(&batch::run(radios, rfantenna::GET_SELECTED_SECTOR, |radio| {
                completed(RfAntenna::new(radio, policy).get_selected_sector(sector_type, peer))
            }))
        }
        Command::Selected(SelectedCommand::Set {
            sector_type,
            peer,
            index,
        }) => report(&batch::run(radios, rfantenna::SET_SELECTED_SECTOR, |radio| {
            completed(RfAntenna::new(radio, policy).set_selected_sector(sector_type, peer, index))
        })),
        Command::Mailbox => report(&batch::run(radios, 0, |radio| {
            completed(WmiClient::new(radio).read_mailbox().map_err(NodeError::from))
        })),
        Command::Wmi(command) => run_wmi(radios, command),
        Command::Nla(NlaCommand::Decode { .. }) => Err(anyhow!("nla decode needs no radio")),
    }
}
