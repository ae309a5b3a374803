//! Structured cancellation utilities.
//!
//! This module provides:
//! - CancellationToken for cooperative cancellation with a typed cause
//! - DeadlineGuard for scoping a per-step deadline

mod token;

pub use token::{CancelCause, CancellationToken, DeadlineGuard};
