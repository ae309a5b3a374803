//! Test doubles for steps and process spawning.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use crate::cancellation::CancellationToken;
use crate::errors::{StepCause, StepError};
use crate::process::{CommandFactory, ContextCommand};
use crate::steps::Step;

/// What a scripted command does instead of the real program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Exit 0 silently.
    Succeed,
    /// Exit with the given code.
    Fail(i32),
    /// Print a line on stdout and exit 0.
    Print(String),
    /// Sleep for the duration, then exit 0.
    Hang(Duration),
    /// Write the process id to the file, then sleep for the duration.
    HangRecordingPid(Duration, PathBuf),
}

impl Script {
    fn to_shell(&self) -> String {
        match self {
            Self::Succeed => "exit 0".to_string(),
            Self::Fail(code) => format!("exit {code}"),
            Self::Print(line) => format!("echo {}", quote(line)),
            Self::Hang(duration) => format!("exec sleep {}", duration.as_secs_f64()),
            Self::HangRecordingPid(duration, pid_file) => format!(
                "echo $$ > {}; exec sleep {}",
                quote(&pid_file.to_string_lossy()),
                duration.as_secs_f64()
            ),
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// A [`CommandFactory`] that replaces every program with a `/bin/sh` script.
///
/// Programs without their own script run the default one. Every spawn is
/// recorded as `"<program> <args...>"`.
#[derive(Debug)]
pub struct ScriptedCommandFactory {
    default: Script,
    scripts: Mutex<HashMap<String, Script>>,
    invocations: Mutex<Vec<String>>,
}

impl ScriptedCommandFactory {
    /// Creates a factory that runs `default` for every program.
    #[must_use]
    pub fn new(default: Script) -> Self {
        Self {
            default,
            scripts: Mutex::new(HashMap::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Sets the script for one program.
    #[must_use]
    pub fn with_script(self, program: impl Into<String>, script: Script) -> Self {
        self.scripts.lock().insert(program.into(), script);
        self
    }

    /// Returns the recorded invocations in spawn order.
    #[must_use]
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().clone()
    }

    /// Returns the number of processes spawned.
    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.invocations.lock().len()
    }
}

impl CommandFactory for ScriptedCommandFactory {
    fn command(&self, ctx: &CancellationToken, program: &str, args: &[String]) -> ContextCommand {
        let mut invocation = program.to_string();
        for arg in args {
            invocation.push(' ');
            invocation.push_str(arg);
        }
        self.invocations.lock().push(invocation);

        let script = self
            .scripts
            .lock()
            .get(program)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg(script.to_shell());
        ContextCommand::from_command(ctx, command)
    }
}

/// A step that records calls and returns a configurable outcome.
#[derive(Debug)]
pub struct MockStep {
    name: String,
    outcome: Mutex<Result<String, String>>,
    call_count: Mutex<usize>,
    delay: Duration,
}

impl MockStep {
    /// Creates a mock step that succeeds with `message`.
    #[must_use]
    pub fn succeeding(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: Mutex::new(Ok(message.into())),
            call_count: Mutex::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Creates a mock step that fails with `reason`.
    #[must_use]
    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: Mutex::new(Err(reason.into())),
            call_count: Mutex::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Makes the step sleep for `delay` before returning, without watching
    /// its token.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of times the step was executed.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Step for MockStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &CancellationToken) -> Result<String, StepError> {
        *self.call_count.lock() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.lock().clone().map_err(|reason| {
            StepError::failed(&self.name, StepCause::Io(io::Error::other(reason)))
        })
    }
}
