//! # goci
//!
//! A sequential pipeline runner for Go projects.
//!
//! goci runs a fixed, ordered list of external commands against a project
//! directory and stops at the first failure:
//!
//! - **Steps**: one external command plus the message reported on success
//! - **Bounded steps**: a step run under its own per-invocation deadline
//! - **Signal supervision**: a run races its steps against OS signals and
//!   kills the in-flight process when a stop signal arrives
//! - **Typed failures**: callers branch on [`ErrorKind`] to tell a failed
//!   step from a timeout or an interruption
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use goci::prelude::*;
//! use std::path::Path;
//!
//! # async fn example() -> goci::errors::Result<()> {
//! let mut stdout = std::io::stdout();
//! goci::run(Path::new("./my-service"), &mut stdout).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod process;
pub mod signals;
pub mod steps;
pub mod testing;

pub use pipeline::{run, run_with};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancelCause, CancellationToken};
    pub use crate::config::PipelineConfig;
    pub use crate::errors::{
        ConfigError, ErrorKind, PipelineError, Result, StepCause, StepError,
    };
    pub use crate::pipeline::{go_pipeline, Pipeline, PipelineBuilder};
    pub use crate::process::{CommandFactory, ContextCommand, SystemCommandFactory};
    pub use crate::signals::{Signal, SignalPolicies, SignalPolicy};
    pub use crate::steps::{BoundedStep, CommandStep, OutputCheck, Step};
}

pub use errors::ErrorKind;
