// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of recipe documents.
//!
//! A document names its nodes by id and wires them together through
//! `inputs`, so unlike recipes built through [`RecipeBuilder`] it can
//! describe graphs that are not DAGs. Validation runs in three stages:
//!
//! 1. **Shape**: ids are unique and every node is exactly one of leaf,
//!    parameter or merge
//! 2. **References**: every input and the root name an existing node
//! 3. **Cycles**: depth-first search with a recursion stack, reporting the
//!    cycle path
//!
//! Errors from the first two stages are accumulated. Cycle detection only
//! runs on a graph whose references all resolve.
//!
//! [`RecipeBuilder`]: crate::recipe::RecipeBuilder

use std::collections::{HashMap, HashSet};

use crate::config::document::{NodeKind, RecipeDocument};
use crate::errors::RecipeError;
use crate::observability::messages::recipe::{CyclicRecipeDetected, RecipeValidationFailed};
use crate::observability::messages::StructuredLog;

/// Validate `document`, returning every problem found.
pub fn validate_recipe_document(document: &RecipeDocument) -> Result<(), Vec<RecipeError>> {
    let mut errors = Vec::new();
    errors.extend(validate_unique_ids(document));
    errors.extend(validate_node_shapes(document));
    errors.extend(validate_references(document));

    if errors.is_empty() {
        if let Some(cycle) = find_cycle(document) {
            CyclicRecipeDetected { cycle: &cycle }.log();
            errors.push(RecipeError::CyclicRecipe { cycle });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        RecipeValidationFailed {
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}

fn validate_unique_ids(document: &RecipeDocument) -> Vec<RecipeError> {
    let mut seen = HashSet::new();
    document
        .nodes
        .iter()
        .filter(|node| !seen.insert(node.id.as_str()))
        .map(|node| RecipeError::DuplicateNodeId(node.id.clone()))
        .collect()
}

fn validate_node_shapes(document: &RecipeDocument) -> Vec<RecipeError> {
    document
        .nodes
        .iter()
        .filter_map(|node| node.kind().err())
        .collect()
}

fn validate_references(document: &RecipeDocument) -> Vec<RecipeError> {
    let ids: HashSet<&str> = document.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut errors = Vec::new();

    if !ids.contains(document.root.as_str()) {
        errors.push(RecipeError::MissingRoot(document.root.clone()));
    }
    for node in &document.nodes {
        for input in &node.inputs {
            if !ids.contains(input.as_str()) {
                errors.push(RecipeError::UnresolvedReference {
                    node_id: node.id.clone(),
                    missing: input.clone(),
                });
            }
        }
    }
    errors
}

/// First cycle found walking from each node in document order.
///
/// For `a -> b -> c -> a` the result is `[a, b, c, a]`.
fn find_cycle(document: &RecipeDocument) -> Option<Vec<String>> {
    let graph: HashMap<&str, Vec<&str>> = document
        .nodes
        .iter()
        .filter(|node| matches!(node.kind(), Ok(NodeKind::Merge { .. })))
        .map(|node| (node.id.as_str(), node.inputs.iter().map(String::as_str).collect()))
        .collect();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for node in &document.nodes {
        if !visited.contains(node.id.as_str()) {
            if let Some(cycle) =
                dfs_cycle_detection(&node.id, &graph, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs_cycle_detection<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path)
                {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                let start = path.iter().position(|&n| n == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(neighbor.to_string());
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(yaml: &str) -> RecipeDocument {
        RecipeDocument::from_yaml_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_document() {
        let doc = document(
            r#"
root: merged
nodes:
  - id: a
    source: model_a
  - id: b
    source: model_b
  - id: merged
    method: weighted_sum
    inputs: [a, b]
"#,
        );
        assert!(validate_recipe_document(&doc).is_ok());
    }

    #[test]
    fn test_duplicate_ids_and_missing_references_accumulate() {
        let doc = document(
            r#"
root: nowhere
nodes:
  - id: a
    source: model_a
  - id: a
    source: model_b
  - id: merged
    method: weighted_sum
    inputs: [a, ghost]
"#,
        );
        let errors = validate_recipe_document(&doc).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(&errors[0], RecipeError::DuplicateNodeId(id) if id == "a"));
        assert!(matches!(&errors[1], RecipeError::MissingRoot(id) if id == "nowhere"));
        assert!(matches!(
            &errors[2],
            RecipeError::UnresolvedReference { node_id, missing }
                if node_id == "merged" && missing == "ghost"
        ));
    }

    #[test]
    fn test_cycle_reports_path() {
        let doc = document(
            r#"
root: x
nodes:
  - id: x
    method: weighted_sum
    inputs: [y, leaf_a]
  - id: y
    method: weighted_sum
    inputs: [z, leaf_a]
  - id: z
    method: weighted_sum
    inputs: [x, leaf_a]
  - id: leaf_a
    source: model_a
"#,
        );
        let errors = validate_recipe_document(&doc).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            RecipeError::CyclicRecipe { cycle } => {
                assert_eq!(cycle, &vec!["x", "y", "z", "x"]);
            }
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let doc = document(
            r#"
root: m
nodes:
  - id: m
    method: n_average
    inputs: [m]
"#,
        );
        let errors = validate_recipe_document(&doc).unwrap_err();
        assert!(matches!(
            &errors[0],
            RecipeError::CyclicRecipe { cycle } if cycle == &vec!["m", "m"]
        ));
    }

    #[test]
    fn test_node_must_have_exactly_one_kind() {
        let doc = document(
            r#"
root: both
nodes:
  - id: both
    source: model_a
    method: weighted_sum
  - id: none
"#,
        );
        let errors = validate_recipe_document(&doc).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, RecipeError::InvalidNode { .. })));
    }
}
