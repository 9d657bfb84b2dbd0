// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while building, parsing or validating a recipe.
//!
//! All of these are structural: they are reported before any tensor is read,
//! and evaluation never starts while one is outstanding.

use std::path::PathBuf;
use thiserror::Error;

fn describe_arity(min: &usize, max: &Option<usize>) -> String {
    match max {
        Some(max) if max == min => format!("exactly {}", min),
        Some(max) => format!("between {} and {}", min, max),
        None => format!("at least {}", min),
    }
}

#[derive(Debug, Error)]
pub enum RecipeError {
    /// Number of inputs outside the method's declared bounds.
    #[error("method '{method}' expects {} inputs, got {actual}", describe_arity(.min, .max))]
    Arity {
        method: String,
        min: usize,
        max: Option<usize>,
        actual: usize,
    },

    #[error("method '{method}' requires hyperparameter '{name}'")]
    MissingHyperparameter { method: String, name: String },

    #[error("method '{method}' has no hyperparameter named '{name}'")]
    UnknownHyperparameter { method: String, name: String },

    #[error("hyperparameter '{name}' of method '{method}' expects {expected}, got {actual}")]
    HyperparameterType {
        method: String,
        name: String,
        expected: String,
        actual: String,
    },

    #[error("hyperparameter '{name}' is invalid: {reason}")]
    InvalidHyperparameter { name: String, reason: String },

    /// Input merge space does not satisfy the method's declaration.
    #[error("method '{method}' input {index} must be in {expected} space, got {actual}")]
    MergeSpaceMismatch {
        method: String,
        index: usize,
        expected: String,
        actual: String,
    },

    /// A string parameter cannot stand in for a tensor input.
    #[error("method '{method}' input {index} is the non-numeric parameter '{name}'")]
    NonNumericInput {
        method: String,
        index: usize,
        name: String,
    },

    #[error("unknown merge method '{0}'")]
    UnknownMethod(String),

    #[error("unknown architecture '{0}'")]
    UnknownArchitecture(String),

    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("'{name}' is not defined before line {line}")]
    UndefinedName { name: String, line: usize },

    #[error("'{name}' is bound more than once (line {line})")]
    DuplicateBinding { name: String, line: usize },

    /// The recipe graph contains a cycle; `cycle` lists the node ids on it.
    #[error("cyclic recipe detected: {}", .cycle.join(" -> "))]
    CyclicRecipe { cycle: Vec<String> },

    #[error("duplicate node id: '{0}'")]
    DuplicateNodeId(String),

    #[error("node '{node_id}' references '{missing}' which does not exist")]
    UnresolvedReference { node_id: String, missing: String },

    #[error("root node '{0}' does not exist")]
    MissingRoot(String),

    #[error("node '{node_id}' is invalid: {reason}")]
    InvalidNode { node_id: String, reason: String },

    /// Several problems found in one recipe document.
    #[error("recipe validation failed:\n{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<RecipeError>),

    #[error("failed to read recipe '{path}': {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to parse recipe document: {0}")]
    Document(String),
}
