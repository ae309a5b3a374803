//! Injectable process spawning.

use super::ContextCommand;
use crate::cancellation::CancellationToken;

/// Builds the runnable handle for a step's command.
///
/// Bounded steps spawn through this trait so tests can substitute what
/// actually runs without touching shared state. Any closure of the shape
/// `Fn(&CancellationToken, &str, &[String]) -> ContextCommand` is a factory.
#[cfg_attr(test, mockall::automock)]
pub trait CommandFactory: Send + Sync {
    /// Returns a command for `program` with `args`, bound to `ctx`.
    fn command(&self, ctx: &CancellationToken, program: &str, args: &[String]) -> ContextCommand;
}

impl<F> CommandFactory for F
where
    F: Fn(&CancellationToken, &str, &[String]) -> ContextCommand + Send + Sync,
{
    fn command(&self, ctx: &CancellationToken, program: &str, args: &[String]) -> ContextCommand {
        self(ctx, program, args)
    }
}

/// Spawns the named program directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandFactory;

impl CommandFactory for SystemCommandFactory {
    fn command(&self, ctx: &CancellationToken, program: &str, args: &[String]) -> ContextCommand {
        ContextCommand::new(ctx, program, args)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_factory_runs_program() {
        let ctx = CancellationToken::new();
        let args = vec!["-c".to_string(), "exit 0".to_string()];
        let status = SystemCommandFactory
            .command(&ctx, "/bin/sh", &args)
            .status()
            .await
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_closure_is_a_factory() {
        let factory = |ctx: &CancellationToken, _program: &str, _args: &[String]| {
            ContextCommand::new(ctx, "/bin/sh", &["-c".to_string(), "exit 4".to_string()])
        };
        let ctx = CancellationToken::new();
        let status = factory.command(&ctx, "go", &[]).status().await.unwrap();
        assert_eq!(status.code(), Some(4));
    }
}
