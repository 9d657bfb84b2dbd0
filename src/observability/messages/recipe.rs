// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for recipe parsing and document validation.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Recipe text parsed into a graph.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct RecipeParsed {
    pub node_count: usize,
    pub binding_count: usize,
}

impl Display for RecipeParsed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Parsed recipe: {} nodes, {} bindings",
            self.node_count, self.binding_count
        )
    }
}

impl StructuredLog for RecipeParsed {
    fn log(&self) {
        tracing::debug!(
            node_count = self.node_count,
            binding_count = self.binding_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "recipe_parsed",
            span_name = name,
            node_count = self.node_count,
            binding_count = self.binding_count,
        )
    }
}

/// Cyclic reference found in a recipe document.
///
/// # Log Level
/// `error!` - Critical validation failure that prevents execution
///
/// # Example
/// ```
/// use mergewood::observability::messages::recipe::CyclicRecipeDetected;
///
/// let cycle = vec!["a".to_string(), "b".to_string(), "a".to_string()];
/// let msg = CyclicRecipeDetected { cycle: &cycle };
///
/// assert_eq!(msg.to_string(), "Cyclic reference detected in recipe: a -> b -> a");
/// ```
pub struct CyclicRecipeDetected<'a> {
    pub cycle: &'a [String],
}

impl Display for CyclicRecipeDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cyclic reference detected in recipe: {}",
            self.cycle.join(" -> ")
        )
    }
}

impl StructuredLog for CyclicRecipeDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = %self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "cyclic_recipe",
            span_name = name,
            cycle = %self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
        )
    }
}

/// Recipe document rejected.
pub struct RecipeValidationFailed {
    pub error_count: usize,
}

impl Display for RecipeValidationFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Recipe validation failed with {} error(s)",
            self.error_count
        )
    }
}

impl StructuredLog for RecipeValidationFailed {
    fn log(&self) {
        tracing::error!(error_count = self.error_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "recipe_validation_failed",
            span_name = name,
            error_count = self.error_count,
        )
    }
}

/// Document node not reachable from the root; it is ignored.
///
/// # Log Level
/// `warn!` - Probably a mistake in the document
pub struct UnreachableDocumentNode<'a> {
    pub node_id: &'a str,
}

impl Display for UnreachableDocumentNode<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' is not reachable from the recipe root and will be ignored",
            self.node_id
        )
    }
}

impl StructuredLog for UnreachableDocumentNode<'_> {
    fn log(&self) {
        tracing::warn!(node_id = self.node_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("unreachable_node", span_name = name, node_id = self.node_id)
    }
}
