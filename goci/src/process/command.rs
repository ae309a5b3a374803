//! A command bound to a cancellation token.

use crate::cancellation::CancellationToken;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::debug;

/// A runnable process handle whose child is killed when its token is cancelled.
///
/// Stdin is closed; stderr is inherited. Stdout is inherited by [`status`]
/// and captured by [`output`].
///
/// [`status`]: ContextCommand::status
/// [`output`]: ContextCommand::output
#[derive(Debug)]
pub struct ContextCommand {
    command: Command,
    ctx: CancellationToken,
}

impl ContextCommand {
    /// Creates a command running `program` with `args`, bound to `ctx`.
    #[must_use]
    pub fn new(ctx: &CancellationToken, program: impl AsRef<OsStr>, args: &[String]) -> Self {
        let mut command = Command::new(program);
        command.args(args);
        Self::from_command(ctx, command)
    }

    /// Binds an already configured command to `ctx`.
    #[must_use]
    pub fn from_command(ctx: &CancellationToken, mut command: Command) -> Self {
        command.kill_on_drop(true);
        Self {
            command,
            ctx: ctx.clone(),
        }
    }

    /// Sets the working directory.
    pub fn current_dir(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        self.command.current_dir(dir);
        self
    }

    /// Runs the command to completion and returns its exit status.
    ///
    /// If the token is cancelled first, the child is killed and reaped and
    /// the (unsuccessful) status of the killed child is returned.
    pub async fn status(mut self) -> io::Result<ExitStatus> {
        self.command
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        let mut child = self.command.spawn()?;
        supervise(&self.ctx, &mut child).await
    }

    /// Runs the command to completion, capturing stdout.
    pub async fn output(mut self) -> io::Result<Output> {
        self.command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let mut child = self.command.spawn()?;

        let mut pipe = child.stdout.take();
        let reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = pipe.as_mut() {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, io::Error>(buf)
        });

        let status = supervise(&self.ctx, &mut child).await?;
        let stdout = reader.await.map_err(io::Error::other)??;

        Ok(Output {
            status,
            stdout,
            stderr: Vec::new(),
        })
    }
}

async fn supervise(ctx: &CancellationToken, child: &mut Child) -> io::Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => status,
        () = ctx.cancelled() => {
            debug!(pid = ?child.id(), cause = ?ctx.cause(), "killing process");
            child.kill().await?;
            child.wait().await
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::cancellation::CancelCause;
    use std::time::{Duration, Instant};

    fn sh(script: &str) -> Command {
        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg(script);
        command
    }

    #[tokio::test]
    async fn test_status_success() {
        let ctx = CancellationToken::new();
        let status = ContextCommand::from_command(&ctx, sh("exit 0"))
            .status()
            .await
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_status_failure() {
        let ctx = CancellationToken::new();
        let status = ContextCommand::from_command(&ctx, sh("exit 3"))
            .status()
            .await
            .unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_io_error() {
        let ctx = CancellationToken::new();
        let result = ContextCommand::new(&ctx, "goci-no-such-binary", &[])
            .status()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_output_captures_stdout() {
        let ctx = CancellationToken::new();
        let output = ContextCommand::from_command(&ctx, sh("echo main.go"))
            .output()
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "main.go\n");
    }

    #[tokio::test]
    async fn test_current_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CancellationToken::new();
        let mut command = ContextCommand::from_command(&ctx, sh("pwd"));
        command.current_dir(dir.path());
        let output = command.output().await.unwrap();

        let printed = String::from_utf8_lossy(&output.stdout);
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(printed.trim()).canonicalize().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_cancellation_kills_child() {
        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel(CancelCause::Requested("test".into()));
        });

        let start = Instant::now();
        let status = ContextCommand::from_command(&ctx, sh("exec sleep 30"))
            .status()
            .await
            .unwrap();

        assert!(!status.success());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancellation_kills_child_while_capturing() {
        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel(CancelCause::DeadlineExceeded);
        });

        let output = ContextCommand::from_command(&ctx, sh("exec sleep 30"))
            .output()
            .await
            .unwrap();
        assert!(!output.status.success());
    }
}
