// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Exercise the process runner against a real shell.
// Author: Lukas Bower
#![cfg(unix)]

use std::time::{Duration, Instant};

use tpy_node::exec::{CommandRunner, ExecError, SystemRunner};

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_owned(), script.to_owned()]
}

#[test]
fn stdin_is_piped_and_stdout_captured() {
    let output = SystemRunner
        .run("/bin/sh", &sh("cat"), b"05000100", Duration::from_secs(5))
        .expect("run");

    assert!(output.success());
    assert_eq!(output.stdout, b"05000100");
    assert!(output.stderr.is_empty());
}

#[test]
fn nonzero_exit_is_reported_with_stderr() {
    let output = SystemRunner
        .run("/bin/sh", &sh("echo 'no such device' >&2; exit 3"), b"", Duration::from_secs(5))
        .expect("run");

    assert!(!output.success());
    assert_eq!(output.status, Some(3));
    assert_eq!(output.stderr, b"no such device\n");
}

#[test]
fn overrunning_process_is_killed() {
    let started = Instant::now();

    let err = SystemRunner
        .run("/bin/sh", &sh("exec sleep 5"), b"", Duration::from_millis(200))
        .expect_err("timeout");

    assert!(matches!(err, ExecError::TimedOut { .. }));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn unread_stdin_does_not_defeat_timeout() {
    let started = Instant::now();
    // Far larger than a pipe buffer, and the child never reads it.
    let input = vec![0x5a; 4 << 20];

    let err = SystemRunner
        .run("/bin/sh", &sh("exec sleep 5"), &input, Duration::from_millis(200))
        .expect_err("timeout");

    assert!(matches!(err, ExecError::TimedOut { .. }));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn missing_program_fails_to_spawn() {
    let err = SystemRunner
        .run("/nonexistent/iw", &[], b"", Duration::from_secs(1))
        .expect_err("spawn");

    assert!(matches!(err, ExecError::Spawn { .. }));
}
