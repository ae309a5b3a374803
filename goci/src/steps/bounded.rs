//! A command step bounded by a deadline.

use super::{CommandStep, Step};
use crate::cancellation::{CancelCause, CancellationToken};
use crate::errors::{StepCause, StepError, INVALID_FORMAT};
use crate::process::CommandFactory;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Timeout used when a bounded step is built with a zero timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How a bounded step decides that its command succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputCheck {
    /// Exit status 0 is success.
    #[default]
    ExitStatus,
    /// Exit status 0 and nothing on stdout is success. Tools such as
    /// `gofmt -l` report problems by listing files while still exiting 0.
    EmptyStdout,
}

/// A [`CommandStep`] run under a per-invocation deadline.
///
/// The process is spawned through the injected [`CommandFactory`] and bound
/// to a child of the caller's token, so it is killed when either the
/// deadline elapses or the caller cancels.
#[derive(Clone)]
pub struct BoundedStep {
    step: CommandStep,
    timeout: Duration,
    check: OutputCheck,
    factory: Arc<dyn CommandFactory>,
}

impl BoundedStep {
    /// Wraps `step` with `timeout`. A zero timeout becomes [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub fn new(step: CommandStep, timeout: Duration, factory: Arc<dyn CommandFactory>) -> Self {
        let timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        Self {
            step,
            timeout,
            check: OutputCheck::ExitStatus,
            factory,
        }
    }

    /// Requires the command to print nothing on stdout.
    #[must_use]
    pub fn expect_empty_output(mut self) -> Self {
        self.check = OutputCheck::EmptyStdout;
        self
    }

    /// Returns the wrapped step.
    #[must_use]
    pub fn step(&self) -> &CommandStep {
        &self.step
    }

    /// Returns the timeout applied to each invocation.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the success check.
    #[must_use]
    pub fn check(&self) -> OutputCheck {
        self.check
    }

    /// Runs the step with only its own deadline able to stop it.
    pub async fn run(&self) -> Result<String, StepError> {
        self.execute(&CancellationToken::new()).await
    }

    fn check_stdout(&self, stdout: &[u8]) -> Result<String, StepError> {
        let listed = String::from_utf8_lossy(stdout);
        if listed.trim().is_empty() {
            return Ok(self.step.message().to_string());
        }
        Err(StepError::new(
            self.name(),
            INVALID_FORMAT,
            StepCause::UnexpectedOutput(listed.trim_end().to_string()),
        ))
    }
}

#[async_trait]
impl Step for BoundedStep {
    fn name(&self) -> &str {
        Step::name(&self.step)
    }

    async fn execute(&self, parent: &CancellationToken) -> Result<String, StepError> {
        let (ctx, _deadline) = parent.with_timeout(self.timeout);

        let mut command = self
            .factory
            .command(&ctx, self.step.program(), self.step.args());
        command.current_dir(self.step.dir());

        debug!(
            step = %self.name(),
            timeout_ms = self.timeout.as_millis(),
            "spawning bounded step"
        );

        let result = match self.check {
            OutputCheck::ExitStatus => command.status().await,
            OutputCheck::EmptyStdout => match command.output().await {
                Ok(output) if output.status.success() => return self.check_stdout(&output.stdout),
                Ok(output) => Ok(output.status),
                Err(err) => Err(err),
            },
        };

        match self.step.settle(&ctx, result) {
            Err(_) if ctx.cause() == Some(CancelCause::DeadlineExceeded) => {
                Err(StepError::timeout(self.name()))
            }
            outcome => outcome,
        }
    }
}

impl fmt::Debug for BoundedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedStep")
            .field("step", &self.step)
            .field("timeout", &self.timeout)
            .field("check", &self.check)
            .finish_non_exhaustive()
    }
}
