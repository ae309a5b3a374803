//! OS signal supervision for pipeline runs.
//!
//! A run subscribes to a fixed set of signals through a [`SignalWatch`] and
//! drops the subscription when it ends. What a received signal does is decided
//! per signal by a [`SignalPolicy`].

#[cfg(unix)]
mod disposition;
mod watch;

#[cfg(unix)]
pub use disposition::{disposition, Disposition};
pub use watch::{reraise, SignalWatch};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Signals a pipeline run can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    /// `SIGINT`, usually Ctrl-C.
    #[serde(rename = "SIGINT")]
    Interrupt,
    /// `SIGTERM`.
    #[serde(rename = "SIGTERM")]
    Terminate,
    /// `SIGQUIT`, whose default action dumps core.
    #[serde(rename = "SIGQUIT")]
    Quit,
    /// `SIGHUP`.
    #[serde(rename = "SIGHUP")]
    Hangup,
    /// `SIGUSR1`.
    #[serde(rename = "SIGUSR1")]
    User1,
    /// `SIGUSR2`.
    #[serde(rename = "SIGUSR2")]
    User2,
}

impl Signal {
    /// Returns the conventional signal name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Quit => "SIGQUIT",
            Self::Hangup => "SIGHUP",
            Self::User1 => "SIGUSR1",
            Self::User2 => "SIGUSR2",
        }
    }

    /// Returns the raw signal number.
    #[cfg(unix)]
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Interrupt => libc::SIGINT,
            Self::Terminate => libc::SIGTERM,
            Self::Quit => libc::SIGQUIT,
            Self::Hangup => libc::SIGHUP,
            Self::User1 => libc::SIGUSR1,
            Self::User2 => libc::SIGUSR2,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a run does when a watched signal arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPolicy {
    /// Stop the run with an interruption error.
    Abort,
    /// Absorb the signal and keep running.
    Ignore,
    /// Stop the run with an interruption error, then re-deliver the signal
    /// with its default disposition.
    Reraise,
}

impl SignalPolicy {
    /// Returns true if this policy stops the run.
    #[must_use]
    pub const fn stops_run(self) -> bool {
        matches!(self, Self::Abort | Self::Reraise)
    }
}

/// Per-signal policies for a run.
///
/// Signals absent from the map are not watched and keep whatever disposition
/// the process already has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalPolicies(BTreeMap<Signal, SignalPolicy>);

impl Default for SignalPolicies {
    fn default() -> Self {
        Self::new()
            .with(Signal::Interrupt, SignalPolicy::Abort)
            .with(Signal::Terminate, SignalPolicy::Abort)
            .with(Signal::Quit, SignalPolicy::Reraise)
    }
}

impl SignalPolicies {
    /// Creates an empty policy set that watches nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets the policy for a signal.
    #[must_use]
    pub fn with(mut self, signal: Signal, policy: SignalPolicy) -> Self {
        self.0.insert(signal, policy);
        self
    }

    /// Returns the policy for a signal, if it is watched.
    #[must_use]
    pub fn get(&self, signal: Signal) -> Option<SignalPolicy> {
        self.0.get(&signal).copied()
    }

    /// Iterates over watched signals and their policies.
    pub fn iter(&self) -> impl Iterator<Item = (Signal, SignalPolicy)> + '_ {
        self.0.iter().map(|(signal, policy)| (*signal, *policy))
    }

    /// Returns the number of watched signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no signal is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
