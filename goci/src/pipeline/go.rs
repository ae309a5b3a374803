//! The build, test, format and push pipeline for a Go project.

use super::{Pipeline, PipelineBuilder};
use crate::config::PipelineConfig;
use crate::errors::{ConfigError, Result};
use crate::process::{CommandFactory, SystemCommandFactory};
use crate::signals;
use crate::steps::{BoundedStep, CommandStep};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Assembles the Go pipeline for `project_dir`.
///
/// Steps, in order: `go build`, `go test`, `go fmt` (which fails if `gofmt -l`
/// lists any file) and `git push`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingProjectDir`] for an empty path and
/// [`ConfigError::InvalidProjectDir`] when the path is not a directory.
pub fn go_pipeline(
    project_dir: &Path,
    config: &PipelineConfig,
    factory: Arc<dyn CommandFactory>,
) -> Result<Pipeline> {
    if project_dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingProjectDir.into());
    }
    if !project_dir.is_dir() {
        return Err(ConfigError::InvalidProjectDir {
            path: project_dir.to_path_buf(),
        }
        .into());
    }

    let timeout = config.step_timeout();
    let build = CommandStep::new(
        "go build",
        "go",
        "Go Build: SUCCESS",
        project_dir,
        ["build", ".", "errors"],
    );
    let test = CommandStep::new("go test", "go", "Go Test: SUCCESS", project_dir, ["test", "-v"]);
    let fmt = CommandStep::new("go fmt", "gofmt", "Gofmt: SUCCESS", project_dir, ["-l", "."]);
    let push = CommandStep::new(
        "git push",
        "git",
        "Git Push: SUCCESS",
        project_dir,
        ["push", config.remote.as_str(), config.branch.as_str()],
    );

    Ok(PipelineBuilder::new("go")
        .step(BoundedStep::new(build, timeout, factory.clone()))
        .step(BoundedStep::new(test, timeout, factory.clone()))
        .step(BoundedStep::new(fmt, timeout, factory.clone()).expect_empty_output())
        .step(BoundedStep::new(push, config.push_timeout(), factory))
        .signals(config.signals.clone())
        .build())
}

/// Runs the Go pipeline for `project_dir` with default settings.
pub async fn run<W>(project_dir: &Path, out: &mut W) -> Result<()>
where
    W: Write + Send + ?Sized,
{
    run_with(
        project_dir,
        out,
        &PipelineConfig::default(),
        Arc::new(SystemCommandFactory),
    )
    .await
}

/// Runs the Go pipeline for `project_dir`.
///
/// When the run was stopped by a signal whose policy is
/// [`Reraise`](crate::signals::SignalPolicy::Reraise), the signal is delivered
/// again with its default disposition once the run has been torn down. For
/// terminating signals this call then never returns.
pub async fn run_with<W>(
    project_dir: &Path,
    out: &mut W,
    config: &PipelineConfig,
    factory: Arc<dyn CommandFactory>,
) -> Result<()>
where
    W: Write + Send + ?Sized,
{
    let pipeline = go_pipeline(project_dir, config, factory)?;
    info!(project = %project_dir.display(), "running go pipeline");

    let result = pipeline.run(out).await;
    if let Err(err) = &result {
        if let Some(signal) = err.signal().filter(|_| err.should_reraise()) {
            warn!(signal = %signal, "re-raising signal");
            if let Err(flush_err) = out.flush() {
                warn!(error = %flush_err, "failed to flush output");
            }
            if let Err(raise_err) = signals::reraise(signal) {
                warn!(signal = %signal, error = %raise_err, "failed to re-raise signal");
            }
        }
    }
    result
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::testing::{Script, ScriptedCommandFactory};

    #[test]
    fn test_empty_project_dir_rejected() {
        let err = go_pipeline(
            Path::new(""),
            &PipelineConfig::default(),
            Arc::new(ScriptedCommandFactory::new(Script::Succeed)),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.to_string(), "Validation failed: project directory is required");
    }

    #[test]
    fn test_missing_project_dir_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = go_pipeline(
            &dir.path().join("absent"),
            &PipelineConfig::default(),
            Arc::new(ScriptedCommandFactory::new(Script::Succeed)),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_assembles_four_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default()
            .with_step_timeout(0)
            .with_push_timeout(4);
        let pipeline = go_pipeline(
            dir.path(),
            &config,
            Arc::new(ScriptedCommandFactory::new(Script::Succeed)),
        )
        .unwrap();

        let names: Vec<&str> = pipeline.steps().iter().map(|step| step.name()).collect();
        assert_eq!(names, ["go build", "go test", "go fmt", "git push"]);
        assert_eq!(pipeline.signals(), &config.signals);
    }

    #[tokio::test]
    async fn test_push_uses_remote_and_branch() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedCommandFactory::new(Script::Succeed));
        let config = PipelineConfig::default()
            .with_remote("upstream")
            .with_branch("main")
            .with_signals(crate::signals::SignalPolicies::new());

        let mut out = Vec::new();
        run_with(dir.path(), &mut out, &config, factory.clone())
            .await
            .unwrap();

        assert_eq!(
            factory.invocations(),
            [
                "go build . errors",
                "go test -v",
                "gofmt -l .",
                "git push upstream main",
            ]
        );
    }
}
