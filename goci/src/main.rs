//! goci CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use goci::config::PipelineConfig;
use goci::process::SystemCommandFactory;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build, test, format-check and push a Go project.
#[derive(Debug, Parser)]
#[command(name = "goci", version, about)]
struct Cli {
    /// Project directory
    #[arg(short, long, default_value = "")]
    project: PathBuf,

    /// JSON configuration file
    #[arg(long, env = "GOCI_CONFIG")]
    config: Option<PathBuf>,

    /// Timeout in seconds for the build, test and format steps
    #[arg(long)]
    timeout: Option<u64>,

    /// Branch to push
    #[arg(long)]
    branch: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Initialize the tracing subscriber on stderr.
///
/// `-v` flags win over `RUST_LOG`; with neither, only warnings are shown.
fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("goci=warn")),
        1 => EnvFilter::new("goci=info"),
        _ => EnvFilter::new("goci=debug"),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(seconds) = cli.timeout {
        config = config.with_step_timeout(seconds);
    }
    if let Some(branch) = &cli.branch {
        config = config.with_branch(branch.as_str());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    tracing::debug!("goci starting with args: {:?}", cli);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout();
    match goci::run_with(&cli.project, &mut stdout, &config, Arc::new(SystemCommandFactory)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
