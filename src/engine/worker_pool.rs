// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded worker pool over the key universe.
//!
//! Keys are dispatched in key-universe order to blocking worker threads,
//! at most `max_concurrency` at a time. Results come back in any order and
//! pass through an [`OrderedSink`], which writes them to the real sink in
//! key order. Dispatch pauses while the number of in-flight plus
//! finished-but-unwritten keys would exceed `max_buffered_keys`, so the
//! tensors held in memory stay bounded however far one slow key lags.
//!
//! ```text
//!   keys ──dispatch──▶ [worker] [worker] [worker]
//!                          │        │        │
//!                          ▼        ▼        ▼
//!                      OrderedSink (parks out-of-order results)
//!                          │
//!                          ▼
//!                      OutputSink (key order)
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::consts::BUFFERED_KEYS_PER_WORKER;
use crate::engine::evaluator::{evaluate_key, KeyOutcome};
use crate::engine::plan::EvaluationPlan;
use crate::engine::report::MergeReport;
use crate::engine::run::RunState;
use crate::errors::{EvaluationError, FailurePolicy, KeyError};
use crate::io::OrderedSink;
use crate::observability::messages::engine::WorkerPoolConfigured;
use crate::observability::messages::StructuredLog;
use crate::traits::{KeyExecutor, OutputSink};

type KeyResult = (usize, Result<KeyOutcome, KeyError>);

#[derive(Debug, Clone)]
pub struct WorkerPoolExecutor {
    max_concurrency: usize,
    max_buffered_keys: usize,
}

impl WorkerPoolExecutor {
    /// Pool with `max_concurrency` workers and the default buffer bound.
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            max_concurrency,
            max_buffered_keys: max_concurrency * BUFFERED_KEYS_PER_WORKER,
        }
    }

    /// Override the bound on in-flight plus unwritten keys.
    ///
    /// Clamped to at least one so dispatch can always make progress.
    pub fn with_max_buffered_keys(mut self, max_buffered_keys: usize) -> Self {
        self.max_buffered_keys = max_buffered_keys.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn max_buffered_keys(&self) -> usize {
        self.max_buffered_keys
    }

    async fn drive(
        &self,
        plan: &Arc<EvaluationPlan>,
        ordered: &mut OrderedSink<'_>,
        run: &mut RunState,
        cancel: &CancellationToken,
    ) -> Result<(), EvaluationError> {
        let keys = plan.keys();
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut in_flight: JoinSet<KeyResult> = JoinSet::new();
        let mut next = 0;

        loop {
            // Every index below `next` is either parked, in flight or
            // written, so an empty pool implies an empty buffer.
            while next < keys.len()
                && !cancel.is_cancelled()
                && ordered.pending() + in_flight.len() < self.max_buffered_keys
            {
                let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
                    break;
                };
                let task_plan = Arc::clone(plan);
                let index = next;
                in_flight.spawn_blocking(move || {
                    let _permit = permit;
                    (index, evaluate_key(&task_plan, &task_plan.keys()[index]))
                });
                next += 1;
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let (index, outcome) = joined.map_err(|e| EvaluationError::Worker(e.to_string()))?;
            let key = keys[index].as_str();

            match outcome {
                Ok(KeyOutcome::Merged(tensor)) => {
                    ordered.complete(index, key, Some(tensor)).await?;
                    run.record_success(index, key);
                }
                Ok(KeyOutcome::Skipped) => {
                    ordered.complete(index, key, None).await?;
                    run.record_skip(key);
                }
                Err(key_error) => {
                    if let Some(abort) = run.record_failure(key_error) {
                        return Err(abort);
                    }
                    ordered.complete(index, key, None).await?;
                }
            }
        }

        if next < keys.len() {
            return Err(run.cancelled_error());
        }
        Ok(())
    }
}

#[async_trait]
impl KeyExecutor for WorkerPoolExecutor {
    fn strategy(&self) -> &'static str {
        "worker_pool"
    }

    async fn execute_with_cancellation(
        &self,
        plan: Arc<EvaluationPlan>,
        sink: &mut dyn OutputSink,
        failure_policy: FailurePolicy,
        cancel: CancellationToken,
    ) -> Result<MergeReport, EvaluationError> {
        let configured = WorkerPoolConfigured {
            max_concurrency: self.max_concurrency,
            max_buffered_keys: self.max_buffered_keys,
        };
        configured.log();
        let span = configured.span(self.strategy());

        async move {
            let mut run =
                RunState::start(self.strategy(), failure_policy, &plan, self.max_concurrency);

            let (outcome, peak) = {
                let mut ordered = OrderedSink::new(&mut *sink);
                let outcome = self.drive(&plan, &mut ordered, &mut run, &cancel).await;
                (outcome, ordered.peak_pending())
            };

            match outcome {
                Ok(()) => run.complete(sink, &plan, peak).await,
                Err(error) => Err(run.abandon(sink, error).await),
            }
        }
        .instrument(span)
        .await
    }
}
