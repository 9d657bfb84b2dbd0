// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bookkeeping shared by the executors: counters, failure policy and the
//! final sink handoff.

use std::time::Instant;

use crate::engine::plan::EvaluationPlan;
use crate::engine::report::{KeyFailure, MergeReport};
use crate::errors::{EvaluationError, FailurePolicy, KeyError};
use crate::observability::messages::engine::{
    EvaluationAborted, EvaluationCancelled, EvaluationCompleted, EvaluationStarted, KeyFailed,
    KeyMerged, KeySkipped, SinkFinalizeFailed,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{OutputSink, RunStatus};

pub(crate) struct RunState {
    strategy: &'static str,
    policy: FailurePolicy,
    total: usize,
    attempted: usize,
    succeeded: usize,
    skipped: usize,
    failed: Vec<KeyFailure>,
    started: Instant,
}

impl RunState {
    pub(crate) fn start(
        strategy: &'static str,
        policy: FailurePolicy,
        plan: &EvaluationPlan,
        max_concurrency: usize,
    ) -> Self {
        EvaluationStarted {
            strategy,
            key_count: plan.keys().len(),
            max_concurrency,
        }
        .log();

        Self {
            strategy,
            policy,
            total: plan.keys().len(),
            attempted: 0,
            succeeded: 0,
            skipped: 0,
            failed: Vec::new(),
            started: Instant::now(),
        }
    }

    pub(crate) fn record_success(&mut self, index: usize, key: &str) {
        self.attempted += 1;
        self.succeeded += 1;
        KeyMerged { key, index }.log();
    }

    pub(crate) fn record_skip(&mut self, key: &str) {
        self.attempted += 1;
        self.skipped += 1;
        KeySkipped { key }.log();
    }

    /// Record a failed key. Returns the error that ends the run when the
    /// policy says to stop.
    pub(crate) fn record_failure(&mut self, error: KeyError) -> Option<EvaluationError> {
        self.attempted += 1;
        KeyFailed { error: &error }.log();
        self.failed.push(KeyFailure::from(&error));

        match self.policy {
            FailurePolicy::CollectAndContinue => None,
            FailurePolicy::AbortOnFirst => Some(EvaluationError::Aborted {
                key: error.key().to_string(),
                error: Box::new(error),
            }),
        }
    }

    pub(crate) fn cancelled_error(&self) -> EvaluationError {
        EvaluationError::Cancelled {
            completed: self.attempted,
            total: self.total,
        }
    }

    /// Finalize the sink as complete and build the report.
    pub(crate) async fn complete(
        self,
        sink: &mut dyn OutputSink,
        plan: &EvaluationPlan,
        peak_buffered_keys: usize,
    ) -> Result<MergeReport, EvaluationError> {
        sink.finalize(RunStatus::Complete).await?;

        let duration = self.started.elapsed();
        EvaluationCompleted {
            strategy: self.strategy,
            succeeded: self.succeeded,
            skipped: self.skipped,
            failed: self.failed.len(),
            duration,
        }
        .log();

        Ok(MergeReport {
            strategy: self.strategy,
            status: RunStatus::Complete,
            total_keys: self.total,
            attempted: self.attempted,
            succeeded: self.succeeded,
            skipped: self.skipped,
            failed: self.failed,
            peak_buffered_keys,
            duration_ms: duration.as_millis() as u64,
            alignments: plan.alignments().to_vec(),
        })
    }

    /// Finalize the sink as incomplete and hand back the error that ended
    /// the run. A failure to finalize is logged, the original error wins.
    pub(crate) async fn abandon(
        self,
        sink: &mut dyn OutputSink,
        error: EvaluationError,
    ) -> EvaluationError {
        match &error {
            EvaluationError::Cancelled { completed, total } => EvaluationCancelled {
                strategy: self.strategy,
                completed: *completed,
                total: *total,
            }
            .log(),
            other => EvaluationAborted {
                strategy: self.strategy,
                attempted: self.attempted,
                error: other,
            }
            .log(),
        }

        let status = RunStatus::Incomplete {
            reason: error.to_string(),
        };
        if let Err(finalize_error) = sink.finalize(status).await {
            SinkFinalizeFailed {
                error: &finalize_error,
            }
            .log();
        }
        error
    }
}
