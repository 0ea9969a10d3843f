// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Capability handle binding one radio interface to its collaborators.
// Author: Lukas Bower

//! [`RadioHandle`]: everything a control component needs to reach one radio.
//!
//! The handle is cheap to clone. Clones share the per-interface WMI lock, so
//! every component built from the same handle serialises its firmware calls.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::debugfs::DebugFs;
use crate::exec::CommandRunner;

/// How WMI completion events are matched to the command that caused them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Correlation {
    /// Return the whole mailbox; stale events may satisfy a later command.
    #[default]
    Lenient,
    /// Return only records that appeared after the command was written.
    Strict,
}

/// Timing and tool settings shared by every component of a radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioSettings {
    /// `iw` executable used for vendor commands.
    pub iw_path: String,
    /// Bound on one vendor command.
    pub vendor_timeout: Duration,
    /// Bound on waiting for a fresh mailbox record in strict mode.
    pub wmi_timeout: Duration,
    /// Mailbox re-read interval in strict mode.
    pub wmi_poll: Duration,
    /// Event correlation mode.
    pub correlation: Correlation,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            iw_path: "iw".to_owned(),
            vendor_timeout: Duration::from_millis(2000),
            wmi_timeout: Duration::from_millis(2000),
            wmi_poll: Duration::from_millis(20),
            correlation: Correlation::Lenient,
        }
    }
}

/// Capability value for one radio interface.
#[derive(Clone)]
pub struct RadioHandle {
    name: String,
    iface: String,
    debugfs_dir: PathBuf,
    settings: RadioSettings,
    fs: Arc<dyn DebugFs>,
    runner: Arc<dyn CommandRunner>,
    wmi_lock: Arc<Mutex<()>>,
}

impl RadioHandle {
    /// Bind `iface` to its phy debugfs directory and collaborators.
    pub fn new(
        name: impl Into<String>,
        iface: impl Into<String>,
        debugfs_dir: impl Into<PathBuf>,
        fs: Arc<dyn DebugFs>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            name: name.into(),
            iface: iface.into(),
            debugfs_dir: debugfs_dir.into(),
            settings: RadioSettings::default(),
            fs,
            runner,
            wmi_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Replace the default settings.
    #[must_use]
    pub fn with_settings(mut self, settings: RadioSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Device name used in logs and batch reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Network interface name.
    #[must_use]
    pub fn iface(&self) -> &str {
        &self.iface
    }

    /// Phy debugfs directory.
    #[must_use]
    pub fn debugfs_dir(&self) -> &Path {
        &self.debugfs_dir
    }

    /// Path of a debug file relative to the phy directory.
    #[must_use]
    pub fn debug_path(&self, relative: &str) -> PathBuf {
        self.debugfs_dir.join(relative)
    }

    /// Timing and tool settings.
    #[must_use]
    pub fn settings(&self) -> &RadioSettings {
        &self.settings
    }

    /// Debug file collaborator.
    #[must_use]
    pub fn fs(&self) -> &dyn DebugFs {
        self.fs.as_ref()
    }

    /// Process execution collaborator.
    #[must_use]
    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Take the interface's WMI lock for the duration of one command.
    pub fn lock_wmi(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, a panicked holder leaves nothing torn.
        self.wmi_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RadioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioHandle")
            .field("name", &self.name)
            .field("iface", &self.iface)
            .field("debugfs_dir", &self.debugfs_dir)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
