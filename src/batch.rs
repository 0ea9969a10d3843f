// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Fan one operation out across radios and collect tagged results.
// Author: Lukas Bower

//! Multi-radio fan-out.
//!
//! [`run`] gives every radio its own scoped thread. Calls within one radio
//! still serialise on that radio's WMI lock; distinct radios proceed in
//! parallel. A failing radio never stops the others: hard errors, missing
//! completion events and firmware rejections all land in
//! [`BatchReport::failures`] tagged with the device, interface and command.

use std::thread;

use log::{info, warn};
use serde::Serialize;

use crate::error::NodeError;
use crate::radio::RadioHandle;
use crate::wmi::{Completion, FwStatus};

/// Why one radio did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Hard error, rendered.
    Error(String),
    /// Completion event absent from the mailbox.
    EventNotFound(u16),
    /// Firmware returned a nonzero status.
    Rejected(FwStatus),
}

/// Failed radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceFailure {
    /// Device name.
    pub device: String,
    /// Interface name.
    pub iface: String,
    /// Command the operation issued.
    pub command_id: u32,
    /// Failure detail.
    pub reason: FailureReason,
}

/// Completed radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSuccess<T> {
    /// Device name.
    pub device: String,
    /// Interface name.
    pub iface: String,
    /// Operation result.
    pub value: T,
}

/// Partial-success report, in radio order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport<T> {
    /// Radios that completed.
    pub successes: Vec<DeviceSuccess<T>>,
    /// Radios that did not.
    pub failures: Vec<DeviceFailure>,
}

impl<T> BatchReport<T> {
    /// True when every radio completed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run `op` once per radio, in parallel across radios.
pub fn run<T, F>(radios: &[RadioHandle], command_id: u32, op: F) -> BatchReport<T>
where
    T: Send,
    F: Fn(&RadioHandle) -> Result<Completion<T>, NodeError> + Sync,
{
    let op = &op;
    let outcomes: Vec<Result<Completion<T>, FailureReason>> = thread::scope(|scope| {
        let workers: Vec<_> = radios
            .iter()
            .map(|radio| scope.spawn(move || op(radio)))
            .collect();
        workers
            .into_iter()
            .map(|worker| match worker.join() {
                Ok(result) => result.map_err(|err| FailureReason::Error(err.to_string())),
                Err(_) => Err(FailureReason::Error("worker panicked".to_owned())),
            })
            .collect()
    });

    let mut report = BatchReport {
        successes: Vec::new(),
        failures: Vec::new(),
    };
    for (radio, outcome) in radios.iter().zip(outcomes) {
        let reason = match outcome {
            Ok(Completion::Completed(value)) => {
                report.successes.push(DeviceSuccess {
                    device: radio.name().to_owned(),
                    iface: radio.iface().to_owned(),
                    value,
                });
                continue;
            }
            Ok(Completion::EventNotFound(event_id)) => FailureReason::EventNotFound(event_id),
            Ok(Completion::Rejected(status)) => FailureReason::Rejected(status),
            Err(reason) => reason,
        };
        warn!("{} ({}): command {command_id:#x} failed: {reason:?}", radio.name(), radio.iface());
        report.failures.push(DeviceFailure {
            device: radio.name().to_owned(),
            iface: radio.iface().to_owned(),
            command_id,
            reason,
        });
    }
    info!(
        "command {command_id:#x}: {} of {} radio(s) completed",
        report.successes.len(),
        radios.len()
    );
    report
}
