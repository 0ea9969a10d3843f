// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Byte-oriented access to radio debug files.
// Author: Lukas Bower

//! Debug file collaborator used by the WMI client.

use std::fs;
use std::io;
use std::path::Path;

/// Reads and writes whole debug files.
pub trait DebugFs: Send + Sync {
    /// Read the full contents of `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `data` to `path` in a single write.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// [`DebugFs`] backed by the host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysDebugFs;

impl DebugFs for SysDebugFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        // debugfs command files expect the frame in one write call.
        fs::write(path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sys_debugfs_round_trips_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wmi_send");
        SysDebugFs.write(&path, &[0, 0, 3, 8]).expect("write");
        assert_eq!(SysDebugFs.read(&path).expect("read"), vec![0, 0, 3, 8]);
        assert!(SysDebugFs.read(&dir.path().join("missing")).is_err());
    }
}
