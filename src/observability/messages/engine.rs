// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for evaluation runs.
//!
//! This module contains message types for logging events related to:
//! * Executor configuration
//! * Run lifecycle (start, completion, cancellation, abort)
//! * Per-key outcomes (merged, skipped, failed)
//! * Sink finalization

use crate::errors::{EvaluationError, KeyError, SinkError};
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Evaluation run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use mergewood::observability::messages::engine::EvaluationStarted;
///
/// let msg = EvaluationStarted {
///     strategy: "sequential",
///     key_count: 1131,
///     max_concurrency: 1,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct EvaluationStarted<'a> {
    pub strategy: &'a str,
    pub key_count: usize,
    pub max_concurrency: usize,
}

impl Display for EvaluationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting merge with {} strategy: {} keys, max_concurrency={}",
            self.strategy, self.key_count, self.max_concurrency
        )
    }
}

impl StructuredLog for EvaluationStarted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            key_count = self.key_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "evaluation",
            span_name = name,
            strategy = self.strategy,
            key_count = self.key_count,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// Evaluation run finished every key.
///
/// # Log Level
/// `info!` - Important operational event
pub struct EvaluationCompleted<'a> {
    pub strategy: &'a str,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration: std::time::Duration,
}

impl Display for EvaluationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Merge completed with {} strategy: {} merged, {} skipped, {} failed in {:?}",
            self.strategy, self.succeeded, self.skipped, self.failed, self.duration
        )
    }
}

impl StructuredLog for EvaluationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            succeeded = self.succeeded,
            skipped = self.skipped,
            failed = self.failed,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "evaluation_completed",
            span_name = name,
            strategy = self.strategy,
            succeeded = self.succeeded,
            skipped = self.skipped,
            failed = self.failed,
            duration = ?self.duration,
        )
    }
}

/// Run stopped by its cancellation token.
///
/// # Log Level
/// `warn!` - Run ended early on request
pub struct EvaluationCancelled<'a> {
    pub strategy: &'a str,
    pub completed: usize,
    pub total: usize,
}

impl Display for EvaluationCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Merge cancelled ({} strategy) after {} of {} keys",
            self.strategy, self.completed, self.total
        )
    }
}

impl StructuredLog for EvaluationCancelled<'_> {
    fn log(&self) {
        tracing::warn!(
            strategy = self.strategy,
            completed = self.completed,
            total = self.total,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "evaluation_cancelled",
            span_name = name,
            strategy = self.strategy,
            completed = self.completed,
            total = self.total,
        )
    }
}

/// Run ended by an error: an aborting key failure, the sink, or a worker.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use mergewood::errors::EvaluationError;
/// use mergewood::observability::messages::engine::EvaluationAborted;
///
/// let error = EvaluationError::Worker("worker panicked".to_string());
/// let msg = EvaluationAborted {
///     strategy: "worker_pool",
///     attempted: 17,
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct EvaluationAborted<'a> {
    pub strategy: &'a str,
    pub attempted: usize,
    pub error: &'a EvaluationError,
}

impl Display for EvaluationAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Merge aborted ({} strategy) after {} keys: {}",
            self.strategy, self.attempted, self.error
        )
    }
}

impl StructuredLog for EvaluationAborted<'_> {
    fn log(&self) {
        tracing::error!(
            strategy = self.strategy,
            attempted = self.attempted,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "evaluation_aborted",
            span_name = name,
            strategy = self.strategy,
            attempted = self.attempted,
            error = %self.error,
        )
    }
}

/// Worker pool limits chosen for a run.
///
/// # Log Level
/// `debug!` - Configuration detail
pub struct WorkerPoolConfigured {
    pub max_concurrency: usize,
    pub max_buffered_keys: usize,
}

impl Display for WorkerPoolConfigured {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker pool: max_concurrency={}, max_buffered_keys={}",
            self.max_concurrency, self.max_buffered_keys
        )
    }
}

impl StructuredLog for WorkerPoolConfigured {
    fn log(&self) {
        tracing::debug!(
            max_concurrency = self.max_concurrency,
            max_buffered_keys = self.max_buffered_keys,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "worker_pool",
            span_name = name,
            max_concurrency = self.max_concurrency,
            max_buffered_keys = self.max_buffered_keys,
        )
    }
}

/// A key was merged and handed to the sink.
///
/// # Log Level
/// `debug!` - High volume, one per key
pub struct KeyMerged<'a> {
    pub key: &'a str,
    pub index: usize,
}

impl Display for KeyMerged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Merged key '{}' (#{})", self.key, self.index)
    }
}

impl StructuredLog for KeyMerged<'_> {
    fn log(&self) {
        tracing::debug!(key = self.key, index = self.index, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("key", span_name = name, key = self.key, index = self.index)
    }
}

/// A merge method chose to skip a key.
///
/// # Log Level
/// `debug!` - High volume, expected outcome
pub struct KeySkipped<'a> {
    pub key: &'a str,
}

impl Display for KeySkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Skipped key '{}'", self.key)
    }
}

impl StructuredLog for KeySkipped<'_> {
    fn log(&self) {
        tracing::debug!(key = self.key, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("key_skipped", span_name = name, key = self.key)
    }
}

/// One key could not be produced.
///
/// # Log Level
/// `warn!` - The run continues unless the policy aborts
pub struct KeyFailed<'a> {
    pub error: &'a KeyError,
}

impl Display for KeyFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Key failed: {}", self.error)
    }
}

impl StructuredLog for KeyFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            key = self.error.key(),
            kind = self.error.kind(),
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "key_failed",
            span_name = name,
            key = self.error.key(),
            kind = self.error.kind(),
        )
    }
}

/// The sink could not be finalized after a run ended early.
///
/// # Log Level
/// `error!` - Output may be left in an unknown state
pub struct SinkFinalizeFailed<'a> {
    pub error: &'a SinkError,
}

impl Display for SinkFinalizeFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Failed to finalize output sink: {}", self.error)
    }
}

impl StructuredLog for SinkFinalizeFailed<'_> {
    fn log(&self) {
        tracing::error!(error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("sink_finalize_failed", span_name = name, error = %self.error)
    }
}
