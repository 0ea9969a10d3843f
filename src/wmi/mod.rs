// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Send WMI commands through debugfs and collect mailbox events.
// Author: Lukas Bower

//! WMI command/event client.
//!
//! Commands are written as `{reserved:u16, id:u16, reserved:u32} ++ payload`
//! to `wil6210/wmi_send`; events are read back from the `wil6210/mbox` dump.
//! The mailbox is never drained, so every read returns whatever the rings
//! currently hold. Under [`Correlation::Lenient`] that whole list is handed
//! to the caller and operations pick the first record with their completion
//! event id. [`Correlation::Strict`] narrows the list to records that were
//! not present before the command was written.
//!
//! Calls on one interface are serialised through the handle's WMI lock.

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use log::{debug, info, warn};
use thiserror::Error;

use crate::hexdump::HexdumpError;
use crate::radio::{Correlation, RadioHandle};

pub mod commands;
pub mod mailbox;
pub mod status;

pub use commands::*;
pub use mailbox::{parse_mailbox, Ring, WmiEvent, WMI_HDR_LEN};
pub use status::{FwStatus, StatusTable};

/// Command debug file, relative to the phy debugfs directory.
pub const WMI_SEND: &str = "wil6210/wmi_send";

/// Mailbox debug file, relative to the phy debugfs directory.
pub const WMI_MBOX: &str = "wil6210/mbox";

/// WMI client failure.
#[derive(Debug, Error)]
pub enum WmiError {
    /// Command file could not be written.
    #[error("write {}: {source}", path.display())]
    Write {
        /// Debug file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Mailbox file could not be read.
    #[error("read {}: {source}", path.display())]
    Read {
        /// Debug file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Mailbox text could not be scanned.
    #[error("parse mailbox: {0}")]
    Mailbox(#[from] HexdumpError),
    /// Completion event payload is shorter than its struct.
    #[error("event {event_id:#x}: expected {expected} payload bytes, got {actual}")]
    ShortEvent {
        /// Event id.
        event_id: u16,
        /// Struct size.
        expected: usize,
        /// Payload length.
        actual: usize,
    },
    /// Completion event carries a value outside its enumeration.
    #[error("event {event_id:#x}: unknown {field} value {value}")]
    UnknownValue {
        /// Event id.
        event_id: u16,
        /// Struct field.
        field: &'static str,
        /// Raw value.
        value: u32,
    },
    /// Command argument exceeds its fixed-size field.
    #[error("{field}: {len} entries exceed the limit of {max}")]
    TooLong {
        /// Struct field.
        field: &'static str,
        /// Supplied entries.
        len: usize,
        /// Capacity.
        max: usize,
    },
}

/// Outcome of a firmware operation.
///
/// Only transport and parse failures are errors; an absent completion event
/// or a nonzero firmware status is a value the caller inspects.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Completion<T> {
    /// Firmware reported success.
    Completed(T),
    /// Firmware reported a nonzero status.
    Rejected(FwStatus),
    /// No record with the completion event id was found.
    EventNotFound(u16),
}

impl<T> Completion<T> {
    /// Value of a completed operation.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// True for [`Completion::Completed`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Transform the completed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completion<U> {
        match self {
            Self::Completed(value) => Completion::Completed(f(value)),
            Self::Rejected(status) => Completion::Rejected(status),
            Self::EventNotFound(id) => Completion::EventNotFound(id),
        }
    }
}

/// Frame a command for the send register.
#[must_use]
pub fn encode_command(cmd_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(WMI_HDR_LEN + payload.len());
    frame.extend_from_slice(&0u16.to_le_bytes());
    frame.extend_from_slice(&cmd_id.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// WMI client bound to one radio.
#[derive(Debug, Clone, Copy)]
pub struct WmiClient<'a> {
    radio: &'a RadioHandle,
}

impl<'a> WmiClient<'a> {
    /// Client for `radio`.
    #[must_use]
    pub fn new(radio: &'a RadioHandle) -> Self {
        Self { radio }
    }

    /// Radio the client talks to.
    #[must_use]
    pub fn radio(&self) -> &'a RadioHandle {
        self.radio
    }

    /// Write one command and return the mailbox records per the radio's
    /// correlation mode.
    ///
    /// In strict mode the mailbox is re-read until any fresh rx record
    /// appears; use [`WmiClient::call_until`] to wait for a specific one.
    pub fn call(&self, cmd_id: u16, payload: &[u8]) -> Result<Vec<WmiEvent>, WmiError> {
        self.call_until(cmd_id, payload, |_| true)
    }

    /// Like [`WmiClient::call`], but in strict mode keep polling until a
    /// fresh rx record satisfies `wanted` or the wait bound elapses.
    pub fn call_until(
        &self,
        cmd_id: u16,
        payload: &[u8],
        wanted: impl Fn(&WmiEvent) -> bool,
    ) -> Result<Vec<WmiEvent>, WmiError> {
        let _guard = self.radio.lock_wmi();
        info!("{}: wmi command {cmd_id:#x} ({} bytes)", self.radio.name(), payload.len());
        let events = match self.radio.settings().correlation {
            Correlation::Lenient => {
                self.send(cmd_id, payload)?;
                self.read_mailbox()?
            }
            Correlation::Strict => {
                let before = self.read_mailbox()?;
                self.send(cmd_id, payload)?;
                self.fresh_records(&before, &wanted)?
            }
        };
        for event in events.iter().filter(|event| event.ring == Ring::Rx) {
            debug!("rx evt {:#x} payload {} ({})", event.id, hex::encode(&event.payload), event.payload.len());
        }
        Ok(events)
    }

    /// Read and parse the mailbox without sending anything.
    pub fn read_mailbox(&self) -> Result<Vec<WmiEvent>, WmiError> {
        let path = self.radio.debug_path(WMI_MBOX);
        let raw = self
            .radio
            .fs()
            .read(&path)
            .map_err(|source| WmiError::Read { path, source })?;
        Ok(parse_mailbox(&String::from_utf8_lossy(&raw))?)
    }

    fn send(&self, cmd_id: u16, payload: &[u8]) -> Result<(), WmiError> {
        let path = self.radio.debug_path(WMI_SEND);
        let frame = encode_command(cmd_id, payload);
        self.radio
            .fs()
            .write(&path, &frame)
            .map_err(|source| WmiError::Write { path, source })
    }

    fn fresh_records(
        &self,
        before: &[WmiEvent],
        wanted: &dyn Fn(&WmiEvent) -> bool,
    ) -> Result<Vec<WmiEvent>, WmiError> {
        let settings = self.radio.settings();
        let deadline = Instant::now() + settings.wmi_timeout;
        loop {
            let fresh: Vec<WmiEvent> = self
                .read_mailbox()?
                .into_iter()
                .filter(|event| !before.contains(event))
                .collect();
            if fresh.iter().any(|event| event.ring == Ring::Rx && wanted(event)) {
                return Ok(fresh);
            }
            if Instant::now() >= deadline {
                warn!(
                    "{}: no fresh matching mailbox event within {:?}",
                    self.radio.name(),
                    settings.wmi_timeout
                );
                return Ok(fresh);
            }
            thread::sleep(settings.wmi_poll);
        }
    }
}
