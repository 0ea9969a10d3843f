// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: In-memory debug file and process collaborators for tests.
// Author: Lukas Bower

//! In-memory collaborators.
//!
//! [`MemoryDebugFs`] serves queued file contents and records writes;
//! [`ScriptedRunner`] replays canned process results and records every
//! invocation. Both are safe to share across threads. [`MailboxDump`]
//! renders mailbox text in the layout of the `wil6210/mbox` debug file.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::debugfs::DebugFs;
use crate::exec::{CommandRunner, ExecError, ProcessOutput};
use crate::wmi::{Ring, WMI_HDR_LEN};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct MemoryFile {
    current: Option<Vec<u8>>,
    queued: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
}

/// [`DebugFs`] held in memory.
///
/// Reads serve queued contents in order; once the queue is empty the last
/// served contents are returned again. Writes are only recorded.
#[derive(Debug, Default)]
pub struct MemoryDebugFs {
    files: Mutex<HashMap<PathBuf, MemoryFile>>,
}

impl MemoryDebugFs {
    /// Empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the contents returned by the next reads of `path`.
    pub fn set(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let mut files = lock(&self.files);
        let file = files.entry(path.as_ref().to_path_buf()).or_default();
        file.queued.clear();
        file.current = Some(contents.into());
    }

    /// Queue contents served by one future read of `path`.
    pub fn queue(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        lock(&self.files)
            .entry(path.as_ref().to_path_buf())
            .or_default()
            .queued
            .push_back(contents.into());
    }

    /// Every write made to `path`, oldest first.
    #[must_use]
    pub fn writes(&self, path: impl AsRef<Path>) -> Vec<Vec<u8>> {
        lock(&self.files)
            .get(path.as_ref())
            .map(|file| file.writes.clone())
            .unwrap_or_default()
    }
}

impl DebugFs for MemoryDebugFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut files = lock(&self.files);
        let file = files
            .get_mut(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))?;
        if let Some(next) = file.queued.pop_front() {
            file.current = Some(next);
        }
        file.current
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut files = lock(&self.files);
        let file = files.entry(path.to_path_buf()).or_default();
        file.writes.push(data.to_vec());
        Ok(())
    }
}

/// Canned outcome of one scripted invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Process ran to completion.
    Exit(ProcessOutput),
    /// Process exceeded its bound.
    TimedOut,
}

impl ScriptedReply {
    /// Successful exit printing `stdout`.
    pub fn stdout(stdout: impl Into<Vec<u8>>) -> Self {
        Self::Exit(ProcessOutput {
            status: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        })
    }

    /// Failed exit with `status` printing `stderr`.
    pub fn failure(status: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self::Exit(ProcessOutput {
            status: Some(status),
            stdout: Vec::new(),
            stderr: stderr.into(),
        })
    }
}

/// Recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Bytes written to standard input.
    pub stdin: Vec<u8>,
    /// Requested bound.
    pub timeout: Duration,
}

/// [`CommandRunner`] replaying queued replies.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<ScriptedReply>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Runner with no replies queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the reply for the next invocation.
    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.replies).push_back(reply);
    }

    /// Every invocation so far, oldest first.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: &[u8],
        timeout: Duration,
    ) -> Result<ProcessOutput, ExecError> {
        lock(&self.invocations).push(Invocation {
            program: program.to_owned(),
            args: args.to_vec(),
            stdin: stdin.to_vec(),
            timeout,
        });
        match lock(&self.replies).pop_front() {
            Some(ScriptedReply::Exit(output)) => Ok(output),
            Some(ScriptedReply::TimedOut) => Err(ExecError::TimedOut {
                program: program.to_owned(),
                timeout,
            }),
            None => Err(ExecError::Spawn {
                program: program.to_owned(),
                source: io::Error::new(io::ErrorKind::NotFound, "no scripted reply"),
            }),
        }
    }
}

/// Builder for `wil6210/mbox` text.
#[derive(Debug, Clone, Default)]
pub struct MailboxDump {
    tx: Vec<(u16, Vec<u8>)>,
    rx: Vec<(u16, Vec<u8>)>,
}

impl MailboxDump {
    /// Dump with both rings empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record with WMI header `id` and `payload` to `slot` of `ring`.
    #[must_use]
    pub fn record(mut self, ring: Ring, slot: u16, id: u16, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(WMI_HDR_LEN + payload.len());
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(&id.to_le_bytes());
        bytes.extend_from_slice(&[0; 4]);
        bytes.extend_from_slice(payload);
        match ring {
            Ring::Tx => self.tx.push((slot, bytes)),
            Ring::Rx => self.rx.push((slot, bytes)),
        }
        self
    }

    /// Add an event to the rx ring.
    #[must_use]
    pub fn rx(self, slot: u16, id: u16, payload: &[u8]) -> Self {
        self.record(Ring::Rx, slot, id, payload)
    }

    /// Add a command to the tx ring.
    #[must_use]
    pub fn tx(self, slot: u16, id: u16, payload: &[u8]) -> Self {
        self.record(Ring::Tx, slot, id, payload)
    }

    /// Render the dump text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = String::new();
        for (label, slots) in [("tx", &self.tx), ("rx", &self.rx)] {
            let _ = writeln!(text, "ring {label} = {{");
            let _ = writeln!(text, "  base = 0x00000000 size = 0x0000 tail = 0x00000000 head = 0x00000000");
            for (slot, bytes) in slots {
                let _ = writeln!(text, "  [{slot:>2x}] F 0x00000000 -> 0000 0000 0000 0000");
                for line in bytes.chunks(16) {
                    let digits: Vec<String> = line.iter().map(|b| format!("{b:02x}")).collect();
                    let _ = writeln!(text, "     : {}", digits.join(" "));
                }
            }
            text.push_str("}\n");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wmi::parse_mailbox;

    #[test]
    fn rendered_dump_parses_back() {
        let payload: Vec<u8> = (0..20).collect();
        let text = MailboxDump::new().tx(0, 0x0803, b"hi").rx(0x1a, 0x1803, &payload).render();
        let events = parse_mailbox(&text).expect("parse");
        assert_eq!(events.len(), 2);
        assert_eq!((events[1].ring, events[1].slot, events[1].id), (Ring::Rx, 0x1a, 0x1803));
        assert_eq!(events[1].payload, payload);
    }

    #[test]
    fn memory_fs_serves_queue_then_repeats() {
        let fs = MemoryDebugFs::new();
        let path = Path::new("/d/mbox");
        assert!(fs.read(path).is_err());
        fs.queue(path, "a");
        fs.queue(path, "b");
        assert_eq!(fs.read(path).expect("read"), b"a");
        assert_eq!(fs.read(path).expect("read"), b"b");
        assert_eq!(fs.read(path).expect("read"), b"b");
        fs.write(path, b"x").expect("write");
        assert_eq!(fs.writes(path), vec![b"x".to_vec()]);
    }
}
