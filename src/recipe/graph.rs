// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};

use crate::recipe::node::{node_id, NodeRef, RecipeNode};
use crate::recipe::serializer;

/// A validated recipe: a DAG of shared, immutable nodes with one root.
#[derive(Debug, Clone)]
pub struct Recipe {
    root: NodeRef,
}

impl Recipe {
    pub(crate) fn new(root: NodeRef) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Distinct leaves in depth-first input order.
    pub fn leaves(&self) -> Vec<NodeRef> {
        let mut leaves = Vec::new();
        self.walk(&mut |node| {
            if matches!(node.as_ref(), RecipeNode::Leaf(_)) {
                leaves.push(node.clone());
            }
        });
        leaves
    }

    /// Number of distinct nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        let mut seen = HashSet::new();
        self.walk(&mut |node| {
            seen.insert(node_id(node));
        });
        seen.len()
    }

    /// Number of incoming edges per node. Repeated inputs count separately.
    pub fn parent_counts(&self) -> HashMap<usize, usize> {
        let mut counts = HashMap::new();
        let mut expanded = HashSet::new();
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            if !expanded.insert(node_id(&node)) {
                continue;
            }
            for child in node.children() {
                *counts.entry(node_id(child)).or_insert(0) += 1;
                stack.push(child.clone());
            }
        }
        counts
    }

    /// Render as recipe text.
    pub fn to_text(&self) -> String {
        serializer::serialize(self)
    }

    /// Pre-order visit of every distinct node.
    fn walk(&self, visit: &mut dyn FnMut(&NodeRef)) {
        fn go(node: &NodeRef, seen: &mut HashSet<usize>, visit: &mut dyn FnMut(&NodeRef)) {
            if !seen.insert(node_id(node)) {
                return;
            }
            visit(node);
            for child in node.children() {
                go(child, seen, visit);
            }
        }
        go(&self.root, &mut HashSet::new(), visit);
    }

    /// Same shape, same values and the same sharing relationships.
    ///
    /// Parameter names are not compared; they only steer serialization.
    pub fn structurally_eq(&self, other: &Recipe) -> bool {
        let mut pairing = NodePairing::default();
        pairing.eq(&self.root, &other.root)
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other)
    }
}

/// Bijection between node identities of two recipes under comparison.
#[derive(Default)]
struct NodePairing {
    left: HashMap<usize, usize>,
    right: HashMap<usize, usize>,
}

impl NodePairing {
    fn eq(&mut self, a: &NodeRef, b: &NodeRef) -> bool {
        let (ia, ib) = (node_id(a), node_id(b));
        match (self.left.get(&ia), self.right.get(&ib)) {
            (Some(&mapped), _) => return mapped == ib,
            (None, Some(_)) => return false,
            (None, None) => {}
        }
        self.left.insert(ia, ib);
        self.right.insert(ib, ia);

        match (a.as_ref(), b.as_ref()) {
            (RecipeNode::Leaf(x), RecipeNode::Leaf(y)) => {
                x.source_id == y.source_id
                    && x.architecture.as_ref().map(|s| &s.name)
                        == y.architecture.as_ref().map(|s| &s.name)
            }
            (RecipeNode::Parameter(x), RecipeNode::Parameter(y)) => x.value == y.value,
            (RecipeNode::MergeOp(x), RecipeNode::MergeOp(y)) => {
                x.method.name() == y.method.name()
                    && x.inputs.len() == y.inputs.len()
                    && x.hyperparameters.len() == y.hyperparameters.len()
                    && x.inputs.iter().zip(&y.inputs).all(|(p, q)| self.eq(p, q))
                    && x
                        .hyperparameters
                        .iter()
                        .zip(&y.hyperparameters)
                        .all(|((kp, p), (kq, q))| kp == kq && self.eq(p, q))
            }
            _ => false,
        }
    }
}
