//! Process-wide signal dispositions held by live subscriptions.
//!
//! The tokio runtime installs its handler for a signal once and never removes
//! it. While at least one [`SignalWatch`](super::SignalWatch) holds a signal
//! that handler is active; when the last holder lets go, the disposition the
//! process had before is put back. A later subscription re-installs the
//! runtime's handler.

use super::Signal;
use parking_lot::{const_mutex, Mutex};
use std::collections::BTreeMap;
use std::io;
use tracing::{debug, warn};

/// How the process currently reacts to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The signal's default action.
    Default,
    /// The signal is discarded.
    Ignore,
    /// A handler function runs.
    Handler,
}

#[derive(Default)]
struct Slot {
    holders: usize,
    previous: Option<libc::sigaction>,
    runtime: Option<libc::sigaction>,
}

static SLOTS: Mutex<BTreeMap<Signal, Slot>> = const_mutex(BTreeMap::new());

/// Returns the current disposition of `signal`.
pub fn disposition(signal: Signal) -> io::Result<Disposition> {
    let action = query(signal)?;
    Ok(match action.sa_sigaction {
        libc::SIG_DFL => Disposition::Default,
        libc::SIG_IGN => Disposition::Ignore,
        _ => Disposition::Handler,
    })
}

/// Takes a hold on `signal` and runs `subscribe` to create the runtime stream.
pub(super) fn acquire<T>(
    signal: Signal,
    subscribe: impl FnOnce() -> io::Result<T>,
) -> io::Result<T> {
    let mut slots = SLOTS.lock();
    let slot = slots.entry(signal).or_default();

    if slot.holders > 0 {
        let stream = subscribe()?;
        slot.holders += 1;
        return Ok(stream);
    }

    let previous = query(signal)?;
    if let Some(runtime) = &slot.runtime {
        install(signal, runtime)?;
    }
    let stream = match subscribe() {
        Ok(stream) => stream,
        Err(err) => {
            install(signal, &previous)?;
            return Err(err);
        }
    };
    if slot.runtime.is_none() {
        slot.runtime = Some(query(signal)?);
    }
    slot.previous = Some(previous);
    slot.holders = 1;
    debug!(signal = %signal, "installed signal handler");
    Ok(stream)
}

/// Drops a hold on `signal`, restoring the earlier disposition on the last one.
pub(super) fn release(signal: Signal) {
    let mut slots = SLOTS.lock();
    let Some(slot) = slots.get_mut(&signal) else {
        return;
    };
    slot.holders = slot.holders.saturating_sub(1);
    if slot.holders > 0 {
        return;
    }
    if let Some(previous) = slot.previous.take() {
        match install(signal, &previous) {
            Ok(()) => debug!(signal = %signal, "restored signal disposition"),
            Err(err) => warn!(signal = %signal, error = %err, "failed to restore signal disposition"),
        }
    }
}

#[allow(unsafe_code)]
fn query(signal: Signal) -> io::Result<libc::sigaction> {
    // SAFETY: `sigaction` is a plain C struct for which all-zero is valid, and
    // a null new action only reads the current disposition into `current`.
    unsafe {
        let mut current: libc::sigaction = std::mem::zeroed();
        if libc::sigaction(signal.as_raw(), std::ptr::null(), &mut current) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(current)
    }
}

#[allow(unsafe_code)]
fn install(signal: Signal, action: &libc::sigaction) -> io::Result<()> {
    // SAFETY: `action` was read back from the kernel by `query`, so it names
    // SIG_DFL, SIG_IGN or a handler that is still mapped in this process.
    unsafe {
        if libc::sigaction(signal.as_raw(), action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
