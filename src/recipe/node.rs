// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::registry::{ArchitectureSchema, HyperValue, Hyperparameters, MergeMethodSpec, MergeSpace};

/// Shared handle to an immutable recipe node.
pub type NodeRef = Arc<RecipeNode>;

/// Reference to a tensor source, optionally aligned to an architecture.
#[derive(Debug)]
pub struct LeafNode {
    pub source_id: String,
    pub architecture: Option<Arc<ArchitectureSchema>>,
}

/// Scalar literal. Named when it was bound to a name in recipe text.
#[derive(Debug)]
pub struct ParameterNode {
    pub name: Option<String>,
    pub value: HyperValue,
}

/// Application of a registered merge method.
#[derive(Debug)]
pub struct MergeOpNode {
    pub method: Arc<MergeMethodSpec>,
    pub inputs: Vec<NodeRef>,
    /// Hyperparameters as written, each a `Parameter` node.
    pub hyperparameters: BTreeMap<String, NodeRef>,
    /// Written values merged with schema defaults.
    pub resolved: Hyperparameters,
    pub space: MergeSpace,
}

#[derive(Debug)]
pub enum RecipeNode {
    Leaf(LeafNode),
    Parameter(ParameterNode),
    MergeOp(MergeOpNode),
}

impl RecipeNode {
    /// Merge space of the values this node produces. Parameters have none.
    pub fn merge_space(&self) -> Option<MergeSpace> {
        match self {
            RecipeNode::Leaf(_) => Some(MergeSpace::Base),
            RecipeNode::Parameter(_) => None,
            RecipeNode::MergeOp(op) => Some(op.space),
        }
    }

    /// Nodes this one depends on: inputs first, then hyperparameters by name.
    pub fn children(&self) -> Vec<&NodeRef> {
        match self {
            RecipeNode::MergeOp(op) => op
                .inputs
                .iter()
                .chain(op.hyperparameters.values())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RecipeNode::Leaf(_) => "leaf",
            RecipeNode::Parameter(_) => "parameter",
            RecipeNode::MergeOp(_) => "merge",
        }
    }
}

/// Identity of a node within one recipe, used for memoization and sharing.
pub(crate) fn node_id(node: &NodeRef) -> usize {
    Arc::as_ptr(node) as usize
}
