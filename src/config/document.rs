// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recipes described as data.
//!
//! A recipe document lists nodes by id and names the root:
//!
//! ```yaml
//! root: merged
//! nodes:
//!   - id: base
//!     source: model_a
//!     architecture: sd1
//!   - id: tuned
//!     source: model_b
//!   - id: merged
//!     method: weighted_sum
//!     inputs: [base, tuned]
//!     hyperparameters:
//!       alpha: 0.25
//! ```
//!
//! A node is a leaf (`source`), a literal parameter (`value`) or a merge
//! (`method`). Documents are validated as a whole before any node is built.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::config::loader::is_toml;
use crate::config::validation::validate_recipe_document;
use crate::errors::RecipeError;
use crate::observability::messages::recipe::UnreachableDocumentNode;
use crate::observability::messages::StructuredLog;
use crate::recipe::{NodeRef, Recipe, RecipeBuilder};
use crate::registry::{is_identifier, HyperValue, RESERVED_WORDS};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeDocument {
    pub root: String,
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub value: Option<LiteralValue>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, LiteralValue>,
}

/// Scalar written in a document. Integers stay integers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&LiteralValue> for HyperValue {
    fn from(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Bool(v) => HyperValue::Bool(*v),
            LiteralValue::Int(v) => HyperValue::Int(*v),
            LiteralValue::Float(v) => HyperValue::Float(*v),
            LiteralValue::String(v) => HyperValue::String(v.clone()),
        }
    }
}

pub(crate) enum NodeKind<'a> {
    Leaf {
        source: &'a str,
        architecture: Option<&'a str>,
    },
    Parameter(&'a LiteralValue),
    Merge {
        method: &'a str,
    },
}

impl NodeSpec {
    pub(crate) fn kind(&self) -> Result<NodeKind<'_>, RecipeError> {
        let invalid = |reason: &str| RecipeError::InvalidNode {
            node_id: self.id.clone(),
            reason: reason.to_string(),
        };

        match (&self.source, &self.value, &self.method) {
            (Some(source), None, None) => {
                if !self.inputs.is_empty() || !self.hyperparameters.is_empty() {
                    return Err(invalid("a leaf takes no inputs or hyperparameters"));
                }
                Ok(NodeKind::Leaf {
                    source,
                    architecture: self.architecture.as_deref(),
                })
            }
            (None, Some(value), None) => {
                if !self.inputs.is_empty()
                    || !self.hyperparameters.is_empty()
                    || self.architecture.is_some()
                {
                    return Err(invalid("a parameter is a bare value"));
                }
                Ok(NodeKind::Parameter(value))
            }
            (None, None, Some(method)) => {
                if self.architecture.is_some() {
                    return Err(invalid("only leaves declare an architecture"));
                }
                Ok(NodeKind::Merge { method })
            }
            (None, None, None) => Err(invalid("expected one of 'source', 'value' or 'method'")),
            _ => Err(invalid("only one of 'source', 'value' or 'method' may be set")),
        }
    }
}

impl RecipeDocument {
    pub fn from_yaml_str(content: &str) -> Result<Self, RecipeError> {
        serde_yaml::from_str(content).map_err(|e| RecipeError::Document(e.to_string()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, RecipeError> {
        toml::from_str(content).map_err(|e| RecipeError::Document(e.to_string()))
    }

    /// Validate the document and build it into a recipe.
    ///
    /// Every validation problem is returned together in
    /// [`RecipeError::Validation`]. Nodes the root does not reach are
    /// logged and ignored.
    pub fn build(&self, builder: &RecipeBuilder) -> Result<Recipe, RecipeError> {
        validate_recipe_document(self).map_err(RecipeError::Validation)?;

        let specs: HashMap<&str, &NodeSpec> =
            self.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let mut built = HashMap::new();
        let root = build_node(&self.root, &specs, builder, &mut built)?;

        let reached: HashSet<&str> = built.keys().copied().collect();
        for node in &self.nodes {
            if !reached.contains(node.id.as_str()) {
                UnreachableDocumentNode { node_id: &node.id }.log();
            }
        }
        Ok(builder.build(root))
    }
}

fn build_node<'d>(
    id: &'d str,
    specs: &HashMap<&'d str, &'d NodeSpec>,
    builder: &RecipeBuilder,
    built: &mut HashMap<&'d str, NodeRef>,
) -> Result<NodeRef, RecipeError> {
    if let Some(node) = built.get(id) {
        return Ok(node.clone());
    }
    let spec: &'d NodeSpec = specs
        .get(id)
        .copied()
        .ok_or_else(|| RecipeError::MissingRoot(id.to_string()))?;

    let node = match spec.kind()? {
        NodeKind::Leaf {
            source,
            architecture: Some(architecture),
        } => builder.leaf_with_architecture(source, architecture)?,
        NodeKind::Leaf {
            source,
            architecture: None,
        } => builder.leaf(source),
        NodeKind::Parameter(value) => {
            if is_identifier(id) && !RESERVED_WORDS.contains(&id) {
                builder.named_parameter(id, value.into())?
            } else {
                builder.parameter(value.into())?
            }
        }
        NodeKind::Merge { method } => {
            let mut inputs = Vec::with_capacity(spec.inputs.len());
            for input in &spec.inputs {
                inputs.push(build_node(input, specs, builder, built)?);
            }
            let hyperparameters: Vec<(&str, HyperValue)> = spec
                .hyperparameters
                .iter()
                .map(|(name, value)| (name.as_str(), value.into()))
                .collect();
            builder.merge(method, inputs, &hyperparameters)?
        }
    };

    built.insert(id, node.clone());
    Ok(node)
}

/// Load a recipe document from YAML, or TOML when the extension is `.toml`.
pub fn load_recipe_document<P: AsRef<Path>>(path: P) -> Result<RecipeDocument, RecipeError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|error| RecipeError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    if is_toml(path) {
        RecipeDocument::from_toml_str(&content)
    } else {
        RecipeDocument::from_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::RecipeNode;
    use crate::registry::ExtensionRegistry;

    fn builder() -> RecipeBuilder {
        RecipeBuilder::new(ExtensionRegistry::with_builtins().unwrap().freeze())
    }

    #[test]
    fn test_literal_values_keep_their_type() {
        let doc = RecipeDocument::from_yaml_str(
            r#"
root: p
nodes:
  - {id: p, value: 3}
  - {id: q, value: 0.5}
  - {id: r, value: true}
  - {id: s, value: text}
"#,
        )
        .unwrap();
        let values: Vec<_> = doc.nodes.iter().map(|n| n.value.clone().unwrap()).collect();
        assert_eq!(
            values,
            vec![
                LiteralValue::Int(3),
                LiteralValue::Float(0.5),
                LiteralValue::Bool(true),
                LiteralValue::String("text".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_preserves_sharing() {
        let doc = RecipeDocument::from_yaml_str(
            r#"
root: merged
nodes:
  - id: base
    source: model_a
  - id: delta
    method: subtract
    inputs: [base, base]
  - id: merged
    method: add_difference
    inputs: [base, delta]
    hyperparameters:
      alpha: 0.5
"#,
        )
        .unwrap();
        let recipe = doc.build(&builder()).unwrap();

        assert_eq!(recipe.leaves().len(), 1);
        assert_eq!(recipe.node_count(), 4);
        let text = recipe.to_text();
        assert!(text.contains("leaf(\"model_a\")"));
        assert!(text.contains("alpha=0.5"));
    }

    #[test]
    fn test_build_reports_builder_errors() {
        let doc = RecipeDocument::from_yaml_str(
            r#"
root: merged
nodes:
  - id: a
    source: model_a
  - id: merged
    method: weighted_sum
    inputs: [a]
"#,
        )
        .unwrap();
        assert!(matches!(
            doc.build(&builder()),
            Err(RecipeError::Arity { actual: 1, .. })
        ));
    }

    #[test]
    fn test_build_rejects_invalid_documents() {
        let doc = RecipeDocument::from_yaml_str(
            r#"
root: m
nodes:
  - id: m
    method: n_average
    inputs: [m]
"#,
        )
        .unwrap();
        match doc.build(&builder()) {
            Err(RecipeError::Validation(errors)) => {
                assert!(matches!(errors[0], RecipeError::CyclicRecipe { .. }))
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_parameter_node_as_input() {
        let doc = RecipeDocument::from_yaml_str(
            r#"
root: clamped
nodes:
  - {id: model, source: model_a}
  - {id: low, value: -1.0}
  - {id: high, value: 1}
  - id: clamped
    method: clamp
    inputs: [model, low, high]
"#,
        )
        .unwrap();
        let recipe = doc.build(&builder()).unwrap();
        let RecipeNode::MergeOp(op) = recipe.root().as_ref() else {
            panic!("root should be a merge");
        };
        assert!(matches!(
            op.inputs[1].as_ref(),
            RecipeNode::Parameter(p) if p.name.as_deref() == Some("low")
        ));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = RecipeDocument::from_yaml_str("root: a\nnodes: []\nextra: 1\n");
        assert!(matches!(result, Err(RecipeError::Document(_))));
    }

    #[test]
    fn test_load_toml_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipe.toml");
        std::fs::write(
            &path,
            r#"
root = "avg"

[[nodes]]
id = "a"
source = "model_a"

[[nodes]]
id = "b"
source = "model_b"

[[nodes]]
id = "avg"
method = "n_average"
inputs = ["a", "b"]
"#,
        )
        .unwrap();

        let doc = load_recipe_document(&path).unwrap();
        let recipe = doc.build(&builder()).unwrap();
        assert_eq!(recipe.leaves().len(), 2);
    }
}
