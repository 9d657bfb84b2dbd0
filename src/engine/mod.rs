// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Streaming evaluation: the per-key evaluator, the evaluation plan and the
//! executors that drive it over the key universe.

mod evaluator;
mod frame;
mod plan;
mod report;
mod run;

pub mod factory;
pub mod sequential;
pub mod worker_pool;

#[cfg(test)]
mod integration_tests;

pub use evaluator::{evaluate_key, KeyOutcome};
pub use factory::ExecutorFactory;
pub use plan::{AlignmentReport, EvaluationPlan};
pub use report::{KeyFailure, MergeReport};
pub use sequential::SequentialExecutor;
pub use worker_pool::WorkerPoolExecutor;
