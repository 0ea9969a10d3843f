// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Run external programs with stdin input, output capture and a kill timeout.
// Author: Lukas Bower

//! Process execution collaborator.
//!
//! [`CommandRunner`] is the seam used by the vendor transport; production
//! code uses [`SystemRunner`], tests substitute
//! `mock::ScriptedRunner` (feature `mock`).

use std::io::{self, Read, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;
use wait_timeout::ChildExt;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// True when the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Failure to run a process to completion.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Waiting on or talking to the child failed.
    #[error("i/o error while running {program}: {source}")]
    Io {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Program exceeded its time bound and was killed.
    #[error("{program} timed out after {timeout:?}")]
    TimedOut {
        /// Program name.
        program: String,
        /// Configured bound.
        timeout: Duration,
    },
}

/// Runs a program to completion.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, feeding `stdin`, bounded by `timeout`.
    ///
    /// Implementations must terminate the program when the bound expires
    /// and report [`ExecError::TimedOut`]. A nonzero exit is not an error
    /// at this level.
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: &[u8],
        timeout: Duration,
    ) -> Result<ProcessOutput, ExecError>;
}

/// [`CommandRunner`] backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: &[u8],
        timeout: Duration,
    ) -> Result<ProcessOutput, ExecError> {
        debug!("exec {} {}", program, args.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.to_owned(),
                source,
            })?;

        let io_err = |source: io::Error| ExecError::Io {
            program: program.to_owned(),
            source,
        };
        let writer = spawn_writer(child.stdin.take(), stdin.to_vec());
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = match child.wait_timeout(timeout).map_err(io_err)? {
            Some(status) => status,
            None => {
                warn!("{program} exceeded {timeout:?}, killing");
                kill(&mut child, program);
                return Err(ExecError::TimedOut {
                    program: program.to_owned(),
                    timeout,
                });
            }
        };
        join_writer(writer).map_err(io_err)?;
        Ok(ProcessOutput {
            status: status.code(),
            stdout: join_reader(stdout).map_err(io_err)?,
            stderr: join_reader(stderr).map_err(io_err)?,
        })
    }
}

trait Pipe: Read + Send + 'static {}
impl Pipe for ChildStdout {}
impl Pipe for ChildStderr {}

fn spawn_writer(pipe: Option<ChildStdin>, input: Vec<u8>) -> Option<JoinHandle<io::Result<()>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || match pipe.write_all(&input) {
            // A program that exits without reading its input closes the pipe early.
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        })
    })
}

fn join_writer(handle: Option<JoinHandle<io::Result<()>>>) -> io::Result<()> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))?,
        None => Ok(()),
    }
}

fn spawn_reader<P: Pipe>(pipe: Option<P>) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "pipe reader panicked"))?,
        None => Ok(Vec::new()),
    }
}

fn kill(child: &mut Child, program: &str) {
    if let Err(err) = child.kill() {
        debug!("kill {program}: {err}");
    }
    let _ = child.wait();
}
