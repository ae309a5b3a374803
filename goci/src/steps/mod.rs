//! Step trait and implementations.
//!
//! Steps are the units of work a pipeline runs in order:
//!
//! - [`CommandStep`] - run one command to completion, no deadline
//! - [`BoundedStep`] - a [`CommandStep`] run under a per-invocation deadline,
//!   spawned through an injectable [`CommandFactory`](crate::process::CommandFactory)

mod bounded;
mod command;

pub use bounded::{BoundedStep, OutputCheck, DEFAULT_TIMEOUT};
pub use command::CommandStep;

use crate::cancellation::CancellationToken;
use crate::errors::StepError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline steps.
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Returns the name of the step, used in error reports.
    fn name(&self) -> &str;

    /// Executes the step.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Cancelled when the enclosing run is interrupted
    ///
    /// # Returns
    ///
    /// The step's success message, or the reason it failed.
    async fn execute(&self, ctx: &CancellationToken) -> Result<String, StepError>;
}
