// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for streaming evaluation and the policy deciding how they propagate.

use crate::tensor::TensorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How per-key failures affect the rest of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and keep merging the remaining keys.
    #[default]
    CollectAndContinue,
    /// Stop dispatching at the first failed key and finalize as incomplete.
    AbortOnFirst,
}

/// Failure reading from a tensor source.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("source '{source_id}' could not be read: {message}")]
    Read { source_id: String, message: String },
}

/// Failure writing to or finalizing the output sink.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("failed to write '{key}': {message}")]
    Write { key: String, message: String },

    #[error("failed to finalize output: {0}")]
    Finalize(String),

    #[error("output sink is already finalized")]
    Closed,
}

/// Error returned by a merge method's per-key function.
#[derive(Debug, Error)]
pub enum MethodError {
    /// The function needed input `index` but it is absent for this key.
    #[error("input {index} is absent")]
    MissingInput { index: usize },

    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// Inputs are individually valid but cannot be combined.
    #[error("{0}")]
    Incompatible(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// A failure confined to a single output key.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key '{key}' is absent from {origin}")]
    MissingKey { key: String, origin: String },

    #[error(
        "key '{key}' of source '{source_id}' matches several keys equally well ({similarity:.3}): {}",
        .candidates.join(", ")
    )]
    AmbiguousKey {
        key: String,
        source_id: String,
        candidates: Vec<String>,
        similarity: f64,
    },

    #[error("key '{key}': method '{method}' rejected its inputs: {reason}")]
    IncompatibleTensor {
        key: String,
        method: String,
        reason: String,
    },

    #[error("key '{key}': method '{method}' failed: {message}")]
    MethodFailed {
        key: String,
        method: String,
        message: String,
    },

    #[error("key '{key}': {error}")]
    Source {
        key: String,
        #[source]
        error: SourceError,
    },
}

impl KeyError {
    pub fn key(&self) -> &str {
        match self {
            KeyError::MissingKey { key, .. }
            | KeyError::AmbiguousKey { key, .. }
            | KeyError::IncompatibleTensor { key, .. }
            | KeyError::MethodFailed { key, .. }
            | KeyError::Source { key, .. } => key,
        }
    }

    /// Short machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            KeyError::MissingKey { .. } => "missing_key",
            KeyError::AmbiguousKey { .. } => "ambiguous_key",
            KeyError::IncompatibleTensor { .. } => "incompatible_tensor",
            KeyError::MethodFailed { .. } => "method_failed",
            KeyError::Source { .. } => "source",
        }
    }
}

/// Errors that end an evaluation run.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("recipe references source '{0}' which is not in the catalog")]
    UnknownSource(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Cooperative cancellation; the sink was finalized as incomplete.
    #[error("evaluation cancelled after {completed} of {total} keys")]
    Cancelled { completed: usize, total: usize },

    /// First per-key failure under `FailurePolicy::AbortOnFirst`.
    #[error("evaluation aborted at key '{key}': {error}")]
    Aborted {
        key: String,
        #[source]
        error: Box<KeyError>,
    },

    #[error("worker task failed: {0}")]
    Worker(String),
}
