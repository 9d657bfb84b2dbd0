// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One key at a time, in key-universe order.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::engine::evaluator::{evaluate_key, KeyOutcome};
use crate::engine::plan::EvaluationPlan;
use crate::engine::report::MergeReport;
use crate::engine::run::RunState;
use crate::errors::{EvaluationError, FailurePolicy};
use crate::traits::{KeyExecutor, OutputSink};

/// Evaluates keys strictly one after another.
///
/// Each key still runs on a blocking thread so merge functions never stall
/// the async runtime. Memory holds at most one key's frame at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialExecutor;

impl SequentialExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeyExecutor for SequentialExecutor {
    fn strategy(&self) -> &'static str {
        "sequential"
    }

    async fn execute_with_cancellation(
        &self,
        plan: Arc<EvaluationPlan>,
        sink: &mut dyn OutputSink,
        failure_policy: FailurePolicy,
        cancel: CancellationToken,
    ) -> Result<MergeReport, EvaluationError> {
        let mut run = RunState::start(self.strategy(), failure_policy, &plan, 1);

        for index in 0..plan.keys().len() {
            if cancel.is_cancelled() {
                let error = run.cancelled_error();
                return Err(run.abandon(sink, error).await);
            }

            let task_plan = Arc::clone(&plan);
            let joined = tokio::task::spawn_blocking(move || {
                evaluate_key(&task_plan, &task_plan.keys()[index])
            })
            .await;
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let error = EvaluationError::Worker(join_error.to_string());
                    return Err(run.abandon(sink, error).await);
                }
            };

            let key = plan.keys()[index].as_str();
            match outcome {
                Ok(KeyOutcome::Merged(tensor)) => {
                    if let Err(sink_error) = sink.put(key, tensor).await {
                        return Err(run.abandon(sink, sink_error.into()).await);
                    }
                    run.record_success(index, key);
                }
                Ok(KeyOutcome::Skipped) => run.record_skip(key),
                Err(key_error) => {
                    if let Some(abort) = run.record_failure(key_error) {
                        return Err(run.abandon(sink, abort).await);
                    }
                }
            }
        }

        run.complete(sink, &plan, 0).await
    }
}
