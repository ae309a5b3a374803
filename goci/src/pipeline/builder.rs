//! Pipeline builder.

use super::Pipeline;
use crate::signals::SignalPolicies;
use crate::steps::Step;
use std::sync::Arc;

/// Builder for creating pipelines.
///
/// Steps run in the order they are added.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    signals: SignalPolicies,
}

impl PipelineBuilder {
    /// Creates a new builder watching the default signal set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            signals: SignalPolicies::default(),
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn step(self, step: impl Step + 'static) -> Self {
        self.shared_step(Arc::new(step))
    }

    /// Appends a step the caller keeps a handle to.
    #[must_use]
    pub fn shared_step(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Replaces the signal policies.
    #[must_use]
    pub fn signals(mut self, signals: SignalPolicies) -> Self {
        self.signals = signals;
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline::new(self.name, self.steps, self.signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{Signal, SignalPolicy};
    use crate::testing::MockStep;

    #[test]
    fn test_builder_keeps_insertion_order() {
        let pipeline = PipelineBuilder::new("ordered")
            .step(MockStep::succeeding("first", "1"))
            .step(MockStep::succeeding("second", "2"))
            .shared_step(Arc::new(MockStep::succeeding("third", "3")))
            .build();

        let names: Vec<&str> = pipeline.steps().iter().map(|step| step.name()).collect();
        assert_eq!(names, ["first", "second", "third"]);
        assert_eq!(pipeline.name(), "ordered");
    }

    #[test]
    fn test_builder_signal_policies() {
        let pipeline = PipelineBuilder::new("default").build();
        assert_eq!(pipeline.signals(), &SignalPolicies::default());
        assert!(pipeline.is_empty());

        let policies = SignalPolicies::new().with(Signal::Hangup, SignalPolicy::Ignore);
        let pipeline = PipelineBuilder::new("custom").signals(policies.clone()).build();
        assert_eq!(pipeline.signals(), &policies);
    }
}
