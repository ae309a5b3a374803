//! Sequential pipeline runner supervised against OS signals.

use super::PipelineBuilder;
use crate::cancellation::{CancelCause, CancellationToken};
use crate::errors::{PipelineError, Result, StepError};
use crate::signals::{SignalPolicies, SignalPolicy, SignalWatch};
use crate::steps::Step;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// An ordered list of steps run one at a time.
///
/// A run stops at the first failing step. Each success writes the step's
/// message as one line to the sink before the next step starts. For the
/// duration of a run the configured signals are watched; a stopping signal
/// cancels the in-flight step and ends the run with
/// [`PipelineError::Interrupted`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    signals: SignalPolicies,
}

impl Pipeline {
    pub(super) fn new(name: String, steps: Vec<Arc<dyn Step>>, signals: SignalPolicies) -> Self {
        Self {
            name,
            steps,
            signals,
        }
    }

    /// Returns a builder for a pipeline called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the steps in run order.
    #[must_use]
    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    /// Returns the signal policies applied during a run.
    #[must_use]
    pub fn signals(&self) -> &SignalPolicies {
        &self.signals
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in order, writing one line per success to `out`.
    ///
    /// The signal subscription lives exactly as long as this call. A run may
    /// be repeated; each starts from the first step.
    pub async fn run<W>(&self, out: &mut W) -> Result<()>
    where
        W: Write + Send + ?Sized,
    {
        let run_id = Uuid::now_v7();
        let span = info_span!("pipeline_run", pipeline = %self.name, %run_id);
        self.supervise(out).instrument(span).await
    }

    async fn supervise<W>(&self, out: &mut W) -> Result<()>
    where
        W: Write + Send + ?Sized,
    {
        let started = Instant::now();
        let root = CancellationToken::new();
        let mut watch = SignalWatch::subscribe(&self.signals)?;
        info!(steps = self.steps.len(), "pipeline started");

        let body = self.run_steps(&root, out);
        tokio::pin!(body);

        let outcome = tokio::select! {
            biased;
            (signal, policy) = watch.next_stop() => {
                root.cancel(CancelCause::Signal(signal));
                // Wait for the in-flight step to kill and reap its process.
                if let Err(err) = body.await {
                    debug!(error = %err, "in-flight step stopped");
                }
                Err(PipelineError::interrupted(signal, policy == SignalPolicy::Reraise))
            }
            result = &mut body => result,
        };
        drop(watch);

        let elapsed_ms = elapsed_ms(started);
        match &outcome {
            Ok(()) => info!(elapsed_ms, "pipeline succeeded"),
            Err(err) => warn!(elapsed_ms, kind = %err.kind(), error = %err, "pipeline failed"),
        }
        outcome
    }

    async fn run_steps<W>(&self, ctx: &CancellationToken, out: &mut W) -> Result<()>
    where
        W: Write + Send + ?Sized,
    {
        for (index, step) in self.steps.iter().enumerate() {
            stop_if_cancelled(ctx, step.as_ref())?;
            let started = Instant::now();
            debug!(step = step.name(), index, "starting step");

            match step.execute(ctx).await {
                Ok(message) => {
                    // A step that finished after cancellation reports nothing.
                    stop_if_cancelled(ctx, step.as_ref())?;
                    info!(
                        step = step.name(),
                        index,
                        elapsed_ms = elapsed_ms(started),
                        "step succeeded"
                    );
                    writeln!(out, "{message}")?;
                }
                Err(err) => {
                    warn!(
                        step = step.name(),
                        index,
                        elapsed_ms = elapsed_ms(started),
                        kind = %err.kind(),
                        "step failed"
                    );
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }
}

fn stop_if_cancelled(ctx: &CancellationToken, step: &dyn Step) -> Result<()> {
    match ctx.cause() {
        Some(cause) => {
            debug!(step = step.name(), cause = %cause, "run cancelled");
            Err(StepError::failed(step.name(), cause.into()).into())
        }
        None => Ok(()),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
