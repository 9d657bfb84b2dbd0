// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::RecipeError;
use crate::recipe::graph::Recipe;
use crate::recipe::node::{LeafNode, MergeOpNode, NodeRef, ParameterNode, RecipeNode};
use crate::registry::{
    HyperValue, Hyperparameters, InputSpace, MergeMethodSpec, MergeSpace, OutputSpace, Registry,
};

/// Programmatic recipe construction.
///
/// Every node is validated when it is created, so a finished [`Recipe`] is
/// always well formed. Nodes can only reference nodes that already exist,
/// which makes cycles impossible to express.
///
/// # Example
/// ```rust
/// use mergewood::recipe::RecipeBuilder;
/// use mergewood::registry::{ExtensionRegistry, HyperValue};
///
/// let registry = ExtensionRegistry::with_builtins().unwrap().freeze();
/// let builder = RecipeBuilder::new(registry);
///
/// let a = builder.leaf("model_a");
/// let b = builder.leaf("model_b");
/// let merged = builder
///     .merge("weighted_sum", vec![a, b], &[("alpha", HyperValue::Float(0.3))])
///     .unwrap();
/// let recipe = builder.build(merged);
/// assert_eq!(recipe.leaves().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RecipeBuilder {
    registry: Registry,
}

impl RecipeBuilder {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Leaf reading raw keys from `source_id`.
    pub fn leaf(&self, source_id: &str) -> NodeRef {
        Arc::new(RecipeNode::Leaf(LeafNode {
            source_id: source_id.to_string(),
            architecture: None,
        }))
    }

    /// Leaf whose keys are aligned to a registered architecture.
    pub fn leaf_with_architecture(
        &self,
        source_id: &str,
        architecture: &str,
    ) -> Result<NodeRef, RecipeError> {
        let schema = self
            .registry
            .lookup_architecture(architecture)
            .map_err(|_| RecipeError::UnknownArchitecture(architecture.to_string()))?;
        Ok(Arc::new(RecipeNode::Leaf(LeafNode {
            source_id: source_id.to_string(),
            architecture: Some(schema),
        })))
    }

    pub fn parameter(&self, value: HyperValue) -> Result<NodeRef, RecipeError> {
        check_finite("<literal>", &value)?;
        Ok(Arc::new(RecipeNode::Parameter(ParameterNode { name: None, value })))
    }

    /// Parameter carrying a name, written back as a binding when serialized.
    pub fn named_parameter(&self, name: &str, value: HyperValue) -> Result<NodeRef, RecipeError> {
        if !crate::registry::is_identifier(name)
            || crate::registry::RESERVED_WORDS.contains(&name)
        {
            return Err(RecipeError::InvalidHyperparameter {
                name: name.to_string(),
                reason: "parameter names must be identifiers".to_string(),
            });
        }
        check_finite(name, &value)?;
        Ok(Arc::new(RecipeNode::Parameter(ParameterNode {
            name: Some(name.to_string()),
            value,
        })))
    }

    /// Merge node with literal hyperparameter values.
    pub fn merge(
        &self,
        method: &str,
        inputs: Vec<NodeRef>,
        hyperparameters: &[(&str, HyperValue)],
    ) -> Result<NodeRef, RecipeError> {
        let mut nodes = Vec::with_capacity(hyperparameters.len());
        for (name, value) in hyperparameters {
            check_finite(name, value)?;
            nodes.push((
                name.to_string(),
                Arc::new(RecipeNode::Parameter(ParameterNode {
                    name: None,
                    value: value.clone(),
                })),
            ));
        }
        self.merge_op(method, inputs, nodes)
    }

    /// Merge node whose hyperparameters are existing `Parameter` nodes.
    pub fn merge_op(
        &self,
        method: &str,
        inputs: Vec<NodeRef>,
        hyperparameters: Vec<(String, NodeRef)>,
    ) -> Result<NodeRef, RecipeError> {
        let spec = self
            .registry
            .lookup_method(method)
            .map_err(|_| RecipeError::UnknownMethod(method.to_string()))?;

        if !spec.accepts_arity(inputs.len()) {
            return Err(RecipeError::Arity {
                method: method.to_string(),
                min: spec.min_inputs(),
                max: spec.max_inputs(),
                actual: inputs.len(),
            });
        }

        for (index, input) in inputs.iter().enumerate() {
            if let RecipeNode::Parameter(param) = input.as_ref() {
                if param.value.as_f64().is_none() {
                    return Err(RecipeError::NonNumericInput {
                        method: method.to_string(),
                        index,
                        name: param.name.clone().unwrap_or_else(|| param.value.to_string()),
                    });
                }
            }
        }

        let (explicit, resolved) = resolve_hyperparameters(&spec, hyperparameters)?;
        let space = resolve_space(&spec, &inputs)?;

        Ok(Arc::new(RecipeNode::MergeOp(MergeOpNode {
            method: spec,
            inputs,
            hyperparameters: explicit,
            resolved,
            space,
        })))
    }

    pub fn build(&self, root: NodeRef) -> Recipe {
        Recipe::new(root)
    }
}

fn check_finite(name: &str, value: &HyperValue) -> Result<(), RecipeError> {
    if let HyperValue::Float(v) = value {
        if !v.is_finite() {
            return Err(RecipeError::InvalidHyperparameter {
                name: name.to_string(),
                reason: format!("{} is not a finite number", v),
            });
        }
    }
    Ok(())
}

fn resolve_hyperparameters(
    spec: &MergeMethodSpec,
    given: Vec<(String, NodeRef)>,
) -> Result<(BTreeMap<String, NodeRef>, Hyperparameters), RecipeError> {
    let mut explicit = BTreeMap::new();
    let mut values = BTreeMap::new();

    for (name, node) in given {
        let schema = spec
            .hyperparameter(&name)
            .ok_or_else(|| RecipeError::UnknownHyperparameter {
                method: spec.name().to_string(),
                name: name.clone(),
            })?;

        let value = match node.as_ref() {
            RecipeNode::Parameter(param) => &param.value,
            other => {
                return Err(RecipeError::InvalidHyperparameter {
                    name,
                    reason: format!("expected a literal or parameter, got a {} node", other.kind()),
                })
            }
        };

        let coerced = value
            .coerce(schema.ty)
            .ok_or_else(|| RecipeError::HyperparameterType {
                method: spec.name().to_string(),
                name: name.clone(),
                expected: schema.ty.to_string(),
                actual: value.hyper_type().to_string(),
            })?;

        if explicit.contains_key(&name) {
            return Err(RecipeError::InvalidHyperparameter {
                name,
                reason: "given more than once".to_string(),
            });
        }
        values.insert(name.clone(), coerced);
        explicit.insert(name, node);
    }

    for schema in spec.hyperparameters() {
        if values.contains_key(&schema.name) {
            continue;
        }
        match &schema.default {
            Some(default) => {
                values.insert(schema.name.clone(), default.clone());
            }
            None => {
                return Err(RecipeError::MissingHyperparameter {
                    method: spec.name().to_string(),
                    name: schema.name.clone(),
                })
            }
        }
    }

    Ok((explicit, Hyperparameters::new(values)))
}

fn resolve_space(spec: &MergeMethodSpec, inputs: &[NodeRef]) -> Result<MergeSpace, RecipeError> {
    let mut same: Option<MergeSpace> = None;

    for (index, input) in inputs.iter().enumerate() {
        let Some(actual) = input.merge_space() else {
            continue;
        };
        let expected = match spec.input_space(index) {
            InputSpace::Base => MergeSpace::Base,
            InputSpace::Delta => MergeSpace::Delta,
            InputSpace::Same => *same.get_or_insert(actual),
        };
        if actual != expected {
            return Err(RecipeError::MergeSpaceMismatch {
                method: spec.name().to_string(),
                index,
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    }

    Ok(match spec.output_space() {
        OutputSpace::Base => MergeSpace::Base,
        OutputSpace::Delta => MergeSpace::Delta,
        OutputSpace::Same => same.unwrap_or(MergeSpace::Base),
    })
}
