// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::engine::{EvaluationPlan, MergeReport};
use crate::errors::{EvaluationError, FailurePolicy};
use crate::traits::OutputSink;

#[async_trait]
pub trait KeyExecutor: Send + Sync {
    /// Short strategy name used in logs and reports.
    fn strategy(&self) -> &'static str;

    /// Evaluate every key of `plan` and write the results to `sink`.
    ///
    /// - `plan`: resolved recipe, sources and key universe
    /// - `sink`: receives finished tensors in key-universe order
    /// - `failure_policy`: whether a failed key stops the run
    ///
    /// Returns the run report, or the error that ended the run early. In
    /// every case the sink has been finalized before this returns.
    async fn execute(
        &self,
        plan: Arc<EvaluationPlan>,
        sink: &mut dyn OutputSink,
        failure_policy: FailurePolicy,
    ) -> Result<MergeReport, EvaluationError> {
        self.execute_with_cancellation(plan, sink, failure_policy, CancellationToken::new())
            .await
    }

    /// Same as [`execute`](Self::execute), stopping dispatch once `cancel`
    /// fires. Keys already running finish and are written.
    async fn execute_with_cancellation(
        &self,
        plan: Arc<EvaluationPlan>,
        sink: &mut dyn OutputSink,
        failure_policy: FailurePolicy,
        cancel: CancellationToken,
    ) -> Result<MergeReport, EvaluationError>;
}
