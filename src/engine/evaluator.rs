// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Evaluation of the recipe for a single output key.

use std::sync::Arc;

use crate::engine::frame::{EvaluationFrame, Resolved};
use crate::engine::plan::EvaluationPlan;
use crate::errors::{KeyError, MethodError, SourceError};
use crate::recipe::{node_id, LeafNode, MergeOpNode, NodeRef, RecipeNode};
use crate::registry::{MergeContext, MethodOutput};
use crate::resolver::KeyLookup;
use crate::tensor::Tensor;

/// What happened to one key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Merged(Tensor),
    Skipped,
}

/// Evaluate the root of `plan` for `key` in a fresh frame.
///
/// The frame is dropped when this returns, so nothing computed for one key
/// is visible to another.
pub fn evaluate_key(plan: &EvaluationPlan, key: &str) -> Result<KeyOutcome, KeyError> {
    let mut evaluator = KeyEvaluator {
        plan,
        key,
        frame: EvaluationFrame::default(),
    };
    let root = evaluator.resolve(plan.recipe().root())?;
    // Release the frame's handle so the root tensor is moved out, not copied.
    drop(evaluator);
    match root {
        Resolved::Tensor(tensor) => Ok(KeyOutcome::Merged(
            Arc::try_unwrap(tensor).unwrap_or_else(|shared| (*shared).clone()),
        )),
        Resolved::Absent { skipped: true, .. } => Ok(KeyOutcome::Skipped),
        Resolved::Absent { origin, .. } => Err(KeyError::MissingKey {
            key: key.to_string(),
            origin,
        }),
    }
}

struct KeyEvaluator<'p> {
    plan: &'p EvaluationPlan,
    key: &'p str,
    frame: EvaluationFrame,
}

impl KeyEvaluator<'_> {
    fn resolve(&mut self, node: &NodeRef) -> Result<Resolved, KeyError> {
        let id = node_id(node);
        if let Some(value) = self.frame.get(id) {
            return Ok(value.clone());
        }

        let value = match node.as_ref() {
            RecipeNode::Leaf(leaf) => self.fetch(id, leaf)?,
            RecipeNode::Parameter(param) => match param.value.as_f64() {
                Some(v) => Resolved::Tensor(Arc::new(Tensor::scalar(v as f32))),
                None => Resolved::Absent {
                    origin: format!("non-numeric parameter {}", param.value),
                    skipped: false,
                },
            },
            RecipeNode::MergeOp(op) => self.apply(op)?,
        };

        self.frame.insert(id, value.clone());
        Ok(value)
    }

    fn fetch(&self, id: usize, leaf: &LeafNode) -> Result<Resolved, KeyError> {
        let binding = self.plan.leaf(id).ok_or_else(|| KeyError::Source {
            key: self.key.to_string(),
            error: SourceError::Read {
                source_id: leaf.source_id.clone(),
                message: "leaf was not part of the evaluation plan".to_string(),
            },
        })?;
        let absent = || Resolved::Absent {
            origin: format!("source '{}'", leaf.source_id),
            skipped: false,
        };

        match binding.alignment.lookup(self.key) {
            KeyLookup::Found(source_key) => match binding.source.get(source_key) {
                Ok(Some(tensor)) => Ok(Resolved::Tensor(Arc::new(tensor))),
                Ok(None) => Ok(absent()),
                Err(error) => Err(KeyError::Source {
                    key: self.key.to_string(),
                    error,
                }),
            },
            KeyLookup::Absent => Ok(absent()),
            KeyLookup::Ambiguous {
                candidates,
                similarity,
            } => Err(KeyError::AmbiguousKey {
                key: self.key.to_string(),
                source_id: leaf.source_id.clone(),
                candidates: candidates.to_vec(),
                similarity,
            }),
        }
    }

    fn apply(&mut self, op: &MergeOpNode) -> Result<Resolved, KeyError> {
        let mut inputs = Vec::with_capacity(op.inputs.len());
        let mut missing = Vec::with_capacity(op.inputs.len());
        for input in &op.inputs {
            match self.resolve(input)? {
                Resolved::Tensor(tensor) => {
                    inputs.push(Some(tensor));
                    missing.push(None);
                }
                Resolved::Absent { origin, skipped } => {
                    inputs.push(None);
                    missing.push(Some((origin, skipped)));
                }
            }
        }

        let method = op.method.name();
        let ctx = MergeContext {
            key: self.key,
            inputs: &inputs,
            hyperparameters: &op.resolved,
        };

        match op.method.apply(&ctx) {
            Ok(MethodOutput::Tensor(tensor)) => Ok(Resolved::Tensor(Arc::new(tensor))),
            Ok(MethodOutput::Skip) => Ok(Resolved::Absent {
                origin: format!("'{}'", method),
                skipped: true,
            }),
            // A required input that was skipped skips this node as well.
            Err(MethodError::MissingInput { index }) => match missing.get(index).cloned().flatten() {
                Some((origin, skipped)) => Ok(Resolved::Absent { origin, skipped }),
                None => Err(KeyError::MissingKey {
                    key: self.key.to_string(),
                    origin: format!("input {} of '{}'", index, method),
                }),
            },
            Err(MethodError::Tensor(error)) => Err(KeyError::IncompatibleTensor {
                key: self.key.to_string(),
                method: method.to_string(),
                reason: error.to_string(),
            }),
            Err(MethodError::Incompatible(reason)) => Err(KeyError::IncompatibleTensor {
                key: self.key.to_string(),
                method: method.to_string(),
                reason,
            }),
            Err(MethodError::Failed(error)) => Err(KeyError::MethodFailed {
                key: self.key.to_string(),
                method: method.to_string(),
                message: format!("{:#}", error),
            }),
        }
    }
}
