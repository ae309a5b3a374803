//! Scoped signal subscription.

use super::{Signal, SignalPolicies, SignalPolicy};
use std::io;
use tracing::{debug, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[cfg(unix)]
fn kind(signal: Signal) -> SignalKind {
    match signal {
        Signal::Interrupt => SignalKind::interrupt(),
        Signal::Terminate => SignalKind::terminate(),
        Signal::Quit => SignalKind::quit(),
        Signal::Hangup => SignalKind::hangup(),
        Signal::User1 => SignalKind::user_defined1(),
        Signal::User2 => SignalKind::user_defined2(),
    }
}

/// A live subscription to the signals named in a [`SignalPolicies`] set.
///
/// Dropping the watch releases every stream it holds and, once no other
/// watch holds a signal, restores that signal's earlier disposition.
#[cfg(unix)]
pub struct SignalWatch {
    streams: Vec<(Signal, SignalPolicy, tokio::signal::unix::Signal)>,
}

#[cfg(unix)]
impl SignalWatch {
    /// Subscribes to every signal in `policies`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(policies: &SignalPolicies) -> io::Result<Self> {
        let mut watch = Self {
            streams: Vec::with_capacity(policies.len()),
        };
        for (sig, policy) in policies.iter() {
            let stream = super::disposition::acquire(sig, || signal(kind(sig)))?;
            watch.streams.push((sig, policy, stream));
        }
        debug!(count = watch.streams.len(), "subscribed to signals");
        Ok(watch)
    }

    /// Waits for the next signal whose policy stops the run.
    ///
    /// Signals with [`SignalPolicy::Ignore`] are logged and absorbed. Never
    /// resolves if nothing stopping is watched.
    pub async fn next_stop(&mut self) -> (Signal, SignalPolicy) {
        loop {
            if self.streams.is_empty() {
                return std::future::pending().await;
            }

            let (received, index, rest) = futures::future::select_all(
                self.streams
                    .iter_mut()
                    .map(|(_, _, stream)| Box::pin(stream.recv())),
            )
            .await;
            drop(rest);

            let (sig, policy, _) = &self.streams[index];
            let (sig, policy) = (*sig, *policy);

            if received.is_none() {
                debug!(signal = %sig, "signal stream closed");
                drop(self.streams.remove(index));
                super::disposition::release(sig);
                continue;
            }

            if policy.stops_run() {
                info!(signal = %sig, policy = ?policy, "received stop signal");
                return (sig, policy);
            }
            info!(signal = %sig, "ignoring signal");
        }
    }
}

/// A live subscription to Ctrl-C, the only signal observable off Unix.
#[cfg(not(unix))]
pub struct SignalWatch {
    interrupt: Option<SignalPolicy>,
}

#[cfg(not(unix))]
impl SignalWatch {
    /// Subscribes to Ctrl-C if `policies` names [`Signal::Interrupt`].
    pub fn subscribe(policies: &SignalPolicies) -> io::Result<Self> {
        Ok(Self {
            interrupt: policies.get(Signal::Interrupt),
        })
    }

    /// Waits for the next signal whose policy stops the run.
    pub async fn next_stop(&mut self) -> (Signal, SignalPolicy) {
        loop {
            let Some(policy) = self.interrupt else {
                return std::future::pending().await;
            };
            if tokio::signal::ctrl_c().await.is_err() {
                self.interrupt = None;
                continue;
            }
            if policy.stops_run() {
                info!(signal = %Signal::Interrupt, "received stop signal");
                return (Signal::Interrupt, policy);
            }
            info!(signal = %Signal::Interrupt, "ignoring signal");
        }
    }
}

impl Drop for SignalWatch {
    fn drop(&mut self) {
        #[cfg(unix)]
        for (sig, _, stream) in self.streams.drain(..) {
            drop(stream);
            super::disposition::release(sig);
        }
        debug!("released signal subscription");
    }
}

impl std::fmt::Debug for SignalWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        #[cfg(unix)]
        let watched: Vec<Signal> = self.streams.iter().map(|(sig, _, _)| *sig).collect();
        #[cfg(not(unix))]
        let watched: Vec<Signal> = self.interrupt.map(|_| Signal::Interrupt).into_iter().collect();

        f.debug_struct("SignalWatch").field("watched", &watched).finish()
    }
}

/// Restores the default disposition of `signal` and delivers it to this process.
///
/// For terminating signals this does not return.
#[cfg(unix)]
#[allow(unsafe_code)]
pub fn reraise(signal: Signal) -> io::Result<()> {
    let raw = signal.as_raw();
    debug!(signal = %signal, "re-raising signal with default disposition");
    // SAFETY: `raw` is a valid signal number and SIG_DFL is always a valid
    // disposition; neither call touches memory owned by Rust.
    unsafe {
        if libc::signal(raw, libc::SIG_DFL) == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
        if libc::raise(raw) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Signal dispositions cannot be restored off Unix; the caller exits instead.
#[cfg(not(unix))]
pub fn reraise(signal: Signal) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot re-raise {signal} on this platform"),
    ))
}
