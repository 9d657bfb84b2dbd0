// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::OrderingMode;
use crate::errors::EvaluationError;
use crate::io::SourceCatalog;
use crate::observability::messages::resolver::{AlignmentComputed, ComponentKeysMissing};
use crate::observability::messages::StructuredLog;
use crate::recipe::{node_id, Recipe, RecipeNode};
use crate::resolver::{AlignmentSummary, KeyAlignment, KeyResolver};
use crate::traits::TensorSource;

/// Source and key alignment backing one leaf.
#[derive(Clone)]
pub(crate) struct LeafBinding {
    pub source: Arc<dyn TensorSource>,
    pub alignment: Arc<KeyAlignment>,
}

/// Alignment outcome for one (source, architecture) pair.
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentReport {
    pub source_id: String,
    pub architecture: Option<String>,
    pub summary: AlignmentSummary,
}

/// Everything needed to evaluate keys independently of one another.
///
/// Built once per run: sources are looked up, key lists fetched and aligned
/// once per (source, architecture) pair, and the key universe fixed. Workers
/// share the plan read-only.
pub struct EvaluationPlan {
    recipe: Recipe,
    keys: Vec<String>,
    leaves: HashMap<usize, LeafBinding>,
    alignments: Vec<AlignmentReport>,
}

impl EvaluationPlan {
    pub fn build(
        recipe: &Recipe,
        catalog: &SourceCatalog,
        resolver: &KeyResolver,
        ordering: OrderingMode,
    ) -> Result<Self, EvaluationError> {
        let mut cache: HashMap<(String, Option<String>), Arc<KeyAlignment>> = HashMap::new();
        let mut leaves = HashMap::new();
        let mut alignments = Vec::new();
        let mut keys = Vec::new();
        let mut seen_keys = HashSet::new();

        for node in recipe.leaves() {
            let RecipeNode::Leaf(leaf) = node.as_ref() else {
                continue;
            };
            let source = catalog
                .get(&leaf.source_id)
                .ok_or_else(|| EvaluationError::UnknownSource(leaf.source_id.clone()))?;
            let architecture_name = leaf.architecture.as_ref().map(|a| a.name.clone());
            let cache_key = (leaf.source_id.clone(), architecture_name.clone());

            let alignment = match cache.get(&cache_key) {
                Some(alignment) => alignment.clone(),
                None => {
                    let source_keys = source.list_keys()?;
                    let alignment = Arc::new(resolver.align(
                        &leaf.source_id,
                        &source_keys,
                        leaf.architecture.as_ref(),
                    ));
                    let summary = alignment.summary();
                    log_alignment(&leaf.source_id, architecture_name.as_deref(), &summary);
                    alignments.push(AlignmentReport {
                        source_id: leaf.source_id.clone(),
                        architecture: architecture_name,
                        summary,
                    });
                    cache.insert(cache_key, alignment.clone());

                    for key in alignment.output_keys() {
                        if seen_keys.insert(key.to_string()) {
                            keys.push(key.to_string());
                        }
                    }
                    alignment
                }
            };

            leaves.insert(node_id(&node), LeafBinding { source, alignment });
        }

        if ordering == OrderingMode::Lexicographic {
            keys.sort();
        }

        Ok(Self {
            recipe: recipe.clone(),
            keys,
            leaves,
            alignments,
        })
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// The key universe, in output order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn alignments(&self) -> &[AlignmentReport] {
        &self.alignments
    }

    pub(crate) fn leaf(&self, node: usize) -> Option<&LeafBinding> {
        self.leaves.get(&node)
    }
}

impl std::fmt::Debug for EvaluationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationPlan")
            .field("key_count", &self.keys.len())
            .field("leaf_count", &self.leaves.len())
            .field("alignments", &self.alignments)
            .finish()
    }
}

fn log_alignment(source_id: &str, architecture: Option<&str>, summary: &AlignmentSummary) {
    AlignmentComputed {
        source_id,
        architecture: architecture.unwrap_or("raw"),
        summary,
    }
    .log();
    for (component, missing) in &summary.absent_by_component {
        ComponentKeysMissing {
            source_id,
            component,
            missing: *missing,
        }
        .log();
    }
}
