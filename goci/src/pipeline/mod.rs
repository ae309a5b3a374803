//! Pipeline assembly and execution.
//!
//! This module provides:
//! - [`Pipeline`], a sequential runner supervised against OS signals
//! - [`PipelineBuilder`] for assembling a step list
//! - [`go_pipeline`], the build/test/format/push pipeline for a Go project

mod builder;
mod go;
mod runner;


pub use builder::PipelineBuilder;
pub use go::{go_pipeline, run, run_with};
pub use runner::Pipeline;
