//! Testing utilities for goci pipelines.
//!
//! This module provides:
//! - Scripted process spawning so pipelines run without the Go toolchain
//! - Mock steps with configurable outcomes
//! - Process and signal helpers for Unix tests

mod mocks;

pub use mocks::{MockStep, Script, ScriptedCommandFactory};

#[cfg(unix)]
use crate::signals::Signal;
#[cfg(unix)]
use std::io;
#[cfg(unix)]
use std::process::{Command, Stdio};

/// Returns true if a process with `pid` exists.
#[cfg(unix)]
#[must_use]
pub fn process_is_running(pid: u32) -> bool {
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Delivers `signal` to the current process.
///
/// Subscribe to the signal first; otherwise its default action applies to
/// the test process.
#[cfg(unix)]
pub fn send_signal(signal: Signal) -> io::Result<()> {
    let name = signal.name().trim_start_matches("SIG");
    let status = Command::new("kill")
        .arg("-s")
        .arg(name)
        .arg(std::process::id().to_string())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("kill -s {name} exited with {status}")))
    }
}
