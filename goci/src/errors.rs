//! Error types for goci.
//!
//! The taxonomy mirrors the ways a run can end badly:
//!
//! - [`PipelineError::Config`] - the run was refused before any step started
//! - [`PipelineError::Step`] - a step failed or ran past its deadline
//! - [`PipelineError::Interrupted`] - a stop signal arrived during the run
//!
//! Callers should branch on [`PipelineError::kind`] rather than on message text.

use crate::cancellation::CancelCause;
use crate::signals::Signal;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Message attached to a step whose command exited non-zero or could not be spawned.
pub const FAILED_TO_EXECUTE: &str = "failed to execute";

/// Message attached to a step that ran past its deadline.
pub const TIMEOUT_EXCEEDED: &str = "timeout exceeded";

/// Message attached to a step whose output check rejected the command's stdout.
pub const INVALID_FORMAT: &str = "invalid format";

/// Result type alias for goci operations.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Coarse classification of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The pipeline configuration was rejected before any step ran.
    Config,
    /// A step's command failed.
    StepFailed,
    /// A step's command ran past its deadline and was killed.
    Timeout,
    /// A stop signal interrupted the run.
    Interrupted,
    /// Writing to the output sink or subscribing to signals failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::StepFailed => write!(f, "step_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// The main error type for a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run was rejected before any step started.
    #[error("Validation failed: {0}")]
    Config(#[from] ConfigError),

    /// A step failed; surfaced verbatim.
    #[error("{0}")]
    Step(#[from] StepError),

    /// A stop signal arrived while the run was in progress.
    #[error("{signal}: Exiting: Received signal")]
    Interrupted {
        /// The signal that stopped the run.
        signal: Signal,
        /// Whether the signal's default disposition should be restored and re-delivered.
        reraise: bool,
    },

    /// Writing to the sink or installing the signal subscription failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// Creates an interruption error.
    #[must_use]
    pub const fn interrupted(signal: Signal, reraise: bool) -> Self {
        Self::Interrupted { signal, reraise }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Step(err) => err.kind(),
            Self::Interrupted { .. } => ErrorKind::Interrupted,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns the name of the failing step, if a step failed.
    #[must_use]
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::Step(err) => Some(&err.step),
            _ => None,
        }
    }

    /// Returns the signal that interrupted the run, if any.
    #[must_use]
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Self::Interrupted { signal, .. } => Some(*signal),
            Self::Step(StepError {
                cause: StepCause::Interrupted(signal),
                ..
            }) => Some(*signal),
            _ => None,
        }
    }

    /// Returns true if the interrupting signal should be re-delivered with its
    /// default disposition once the run has been torn down.
    #[must_use]
    pub const fn should_reraise(&self) -> bool {
        matches!(self, Self::Interrupted { reraise: true, .. })
    }
}

/// Error raised when the pipeline cannot be assembled.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No project directory was given.
    #[error("project directory is required")]
    MissingProjectDir,

    /// The project directory does not exist or is not a directory.
    #[error("project directory {} is not a directory", path.display())]
    InvalidProjectDir {
        /// The rejected path.
        path: PathBuf,
    },

    /// The configuration file could not be read.
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        /// The configuration file path.
        path: PathBuf,
        /// The underlying IO error.
        source: io::Error,
    },

    /// The configuration file is not valid JSON for [`crate::config::PipelineConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A step's failure: which step, what went wrong, and why.
#[derive(Debug, Error)]
#[error("Step: {step:?}: {message}: Cause: {cause}")]
pub struct StepError {
    /// The step name.
    pub step: String,
    /// Short human-readable description.
    pub message: String,
    /// The underlying cause.
    #[source]
    pub cause: StepCause,
}

impl StepError {
    /// Creates a new step error.
    #[must_use]
    pub fn new(step: impl Into<String>, message: impl Into<String>, cause: StepCause) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
            cause,
        }
    }

    /// Creates a "failed to execute" error.
    #[must_use]
    pub fn failed(step: impl Into<String>, cause: StepCause) -> Self {
        Self::new(step, FAILED_TO_EXECUTE, cause)
    }

    /// Creates a "timeout exceeded" error.
    #[must_use]
    pub fn timeout(step: impl Into<String>) -> Self {
        Self::new(step, TIMEOUT_EXCEEDED, StepCause::DeadlineExceeded)
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self.cause {
            StepCause::DeadlineExceeded => ErrorKind::Timeout,
            StepCause::Interrupted(_) => ErrorKind::Interrupted,
            _ => ErrorKind::StepFailed,
        }
    }

    /// Returns true if the step ran past its deadline.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.cause, StepCause::DeadlineExceeded)
    }
}

/// Why a step failed.
#[derive(Debug, Error)]
pub enum StepCause {
    /// The step's deadline elapsed and its process was killed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A stop signal cancelled the step and its process was killed.
    #[error("interrupted by {0}")]
    Interrupted(Signal),

    /// The step was cancelled for another reason.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The command exited unsuccessfully.
    #[error("{0}")]
    Exit(ExitStatus),

    /// The command could not be spawned or waited on.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// The command succeeded but printed output its check rejects.
    #[error("{0}")]
    UnexpectedOutput(String),
}

impl From<CancelCause> for StepCause {
    fn from(cause: CancelCause) -> Self {
        match cause {
            CancelCause::DeadlineExceeded => Self::DeadlineExceeded,
            CancelCause::Signal(signal) => Self::Interrupted(signal),
            CancelCause::Requested(reason) => Self::Cancelled(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_display_quotes_step_name() {
        let err = StepError::failed("go build", StepCause::UnexpectedOutput("boom".into()));
        assert_eq!(
            err.to_string(),
            "Step: \"go build\": failed to execute: Cause: boom"
        );
    }

    #[test]
    fn test_timeout_error_is_classified() {
        let err = StepError::timeout("git push");
        assert!(err.is_timeout());
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("context deadline exceeded"));

        let err: PipelineError = err.into();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.step_name(), Some("git push"));
    }

    #[test]
    fn test_interrupted_error_display() {
        let err = PipelineError::interrupted(Signal::Interrupt, false);
        assert_eq!(err.to_string(), "SIGINT: Exiting: Received signal");
        assert_eq!(err.kind(), ErrorKind::Interrupted);
        assert_eq!(err.signal(), Some(Signal::Interrupt));
        assert!(!err.should_reraise());
        assert!(PipelineError::interrupted(Signal::Quit, true).should_reraise());
    }

    #[test]
    fn test_config_error_display() {
        let err: PipelineError = ConfigError::MissingProjectDir.into();
        assert_eq!(
            err.to_string(),
            "Validation failed: project directory is required"
        );
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.step_name().is_none());
    }

    #[test]
    fn test_cancel_cause_maps_to_step_cause() {
        assert!(matches!(
            StepCause::from(CancelCause::DeadlineExceeded),
            StepCause::DeadlineExceeded
        ));
        assert!(matches!(
            StepCause::from(CancelCause::Signal(Signal::Terminate)),
            StepCause::Interrupted(Signal::Terminate)
        ));

        let err = StepError::failed("go test", CancelCause::Signal(Signal::Terminate).into());
        assert_eq!(err.kind(), ErrorKind::Interrupted);
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "sink closed");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
