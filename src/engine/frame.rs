// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::tensor::Tensor;

/// Value of one node for the key being evaluated.
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Tensor(Arc<Tensor>),
    /// No value for this key. `skipped` is set when a method chose to skip
    /// rather than an input being missing.
    Absent { origin: String, skipped: bool },
}

/// Per-key memo of node values, keyed by node identity.
///
/// A frame lives for exactly one key. Shared sub-expressions are evaluated
/// once and every parent reads the memoized value.
#[derive(Debug, Default)]
pub(crate) struct EvaluationFrame {
    values: HashMap<usize, Resolved>,
}

impl EvaluationFrame {
    pub(crate) fn get(&self, node: usize) -> Option<&Resolved> {
        self.values.get(&node)
    }

    pub(crate) fn insert(&mut self, node: usize, value: Resolved) {
        self.values.insert(node, value);
    }
}
