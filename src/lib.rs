// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Node-side radio control core for the 60 GHz wireless testbed.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Radio control core of a testbed node.
//!
//! The crate speaks the wil6210 vendor control protocols:
//!
//! * [`vendor`] sends policy-encoded NLA requests through `iw dev .. vendor
//!   recv` and decodes the hex dump it prints, using [`nla_codec`].
//! * [`wmi`] writes firmware commands to the `wil6210/wmi_send` debug file
//!   and correlates completion events read back from `wil6210/mbox`.
//! * [`sector`] packs phased-array sector settings into register words;
//!   [`rfantenna`] moves them through vendor commands.
//!
//! Every component takes a [`radio::RadioHandle`] by reference. The handle
//! carries the interface's collaborators ([`debugfs::DebugFs`],
//! [`exec::CommandRunner`]) and the per-interface WMI lock; [`batch`] fans an
//! operation out across handles.

pub mod batch;
pub mod config;
pub mod debugfs;
pub mod error;
pub mod exec;
mod hexdump;
pub mod mac;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod radio;
pub mod rfantenna;
pub mod sector;
pub mod vendor;
pub mod wmi;

pub use error::NodeError;
pub use hexdump::HexdumpError;
pub use nla_codec;
