// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::errors::SinkError;
use crate::tensor::Tensor;

/// Terminal state handed to [`OutputSink::finalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every key in the key universe was attempted.
    Complete,
    /// The run stopped early; only whole tensors were written.
    Incomplete { reason: String },
}

impl RunStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, RunStatus::Complete)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Complete => f.write_str("complete"),
            RunStatus::Incomplete { reason } => write!(f, "incomplete ({})", reason),
        }
    }
}

/// Destination for merged tensors.
///
/// Executors call `put` from a single task, one key at a time, so
/// implementations need no internal locking. `finalize` is called exactly
/// once, after the last `put`.
#[async_trait]
pub trait OutputSink: Send {
    async fn put(&mut self, key: &str, tensor: Tensor) -> Result<(), SinkError>;

    async fn finalize(&mut self, status: RunStatus) -> Result<(), SinkError>;
}
