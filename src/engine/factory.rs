// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{EngineConfig, Strategy};
use crate::engine::sequential::SequentialExecutor;
use crate::engine::worker_pool::WorkerPoolExecutor;
use crate::traits::KeyExecutor;

/// Factory for creating key executors from configuration
pub struct ExecutorFactory;

impl ExecutorFactory {
    /// Create a key executor based on the configuration strategy
    pub fn from_config(cfg: &EngineConfig) -> Box<dyn KeyExecutor> {
        match cfg.strategy {
            Strategy::Sequential => Box::new(SequentialExecutor::new()),
            Strategy::WorkerPool => Box::new(
                WorkerPoolExecutor::new(cfg.executor_options.effective_concurrency())
                    .with_max_buffered_keys(cfg.executor_options.effective_buffer()),
            ),
        }
    }
}
