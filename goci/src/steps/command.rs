//! A single external command.

use super::Step;
use crate::cancellation::CancellationToken;
use crate::errors::{StepCause, StepError};
use crate::process::ContextCommand;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// One external command plus its reporting metadata.
///
/// Immutable once built; every call to [`execute`](Step::execute) re-runs the
/// command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    name: String,
    program: String,
    args: Vec<String>,
    message: String,
    dir: PathBuf,
}

impl CommandStep {
    /// Creates a new command step.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        message: impl Into<String>,
        dir: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            message: message.into(),
            dir: dir.into(),
        }
    }

    /// Returns the executable.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the success message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the working directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Runs the command to completion with no way to stop it early.
    pub async fn run(&self) -> Result<String, StepError> {
        self.execute(&CancellationToken::new()).await
    }

    /// Turns a process result into this step's outcome.
    pub(crate) fn settle(
        &self,
        ctx: &CancellationToken,
        result: io::Result<ExitStatus>,
    ) -> Result<String, StepError> {
        let cause = match result {
            Ok(status) if status.success() => return Ok(self.message.clone()),
            Ok(status) => StepCause::Exit(status),
            Err(err) => StepCause::Io(err),
        };
        // A killed child reports a bare signal exit; the token says why.
        let cause = ctx.cause().map_or(cause, StepCause::from);
        Err(StepError::failed(&self.name, cause))
    }
}

#[async_trait]
impl Step for CommandStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &CancellationToken) -> Result<String, StepError> {
        let mut command = ContextCommand::new(ctx, &self.program, &self.args);
        command.current_dir(&self.dir);
        let result = command.status().await;
        self.settle(ctx, result)
    }
}
