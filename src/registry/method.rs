// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Merge-method contracts: arity, hyperparameter schema, merge spaces and
//! the per-key function.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::MethodError;
use crate::tensor::Tensor;

/// Value space of a tensor flowing through a recipe.
///
/// Model weights live in `Base`; differences between models live in `Delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeSpace {
    Base,
    Delta,
}

impl fmt::Display for MergeSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeSpace::Base => f.write_str("base"),
            MergeSpace::Delta => f.write_str("delta"),
        }
    }
}

/// Space a method accepts for one input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSpace {
    Base,
    Delta,
    /// Any space, as long as every `Same` input agrees.
    Same,
}

/// Space of a method's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSpace {
    Base,
    Delta,
    /// Whatever space the `Same` inputs share.
    Same,
}

/// Type of a hyperparameter or literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HyperType {
    Float,
    Int,
    Bool,
    String,
}

impl fmt::Display for HyperType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HyperType::Float => "float",
            HyperType::Int => "int",
            HyperType::Bool => "bool",
            HyperType::String => "string",
        };
        f.write_str(name)
    }
}

/// A scalar literal: a hyperparameter value or a recipe `Parameter`.
#[derive(Debug, Clone, PartialEq)]
pub enum HyperValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
}

impl HyperValue {
    pub fn hyper_type(&self) -> HyperType {
        match self {
            HyperValue::Float(_) => HyperType::Float,
            HyperValue::Int(_) => HyperType::Int,
            HyperValue::Bool(_) => HyperType::Bool,
            HyperValue::String(_) => HyperType::String,
        }
    }

    /// Numeric view; ints widen, bools map to 0/1, strings have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HyperValue::Float(v) => Some(*v),
            HyperValue::Int(v) => Some(*v as f64),
            HyperValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            HyperValue::String(_) => None,
        }
    }

    /// Coerce to `expected`, accepting ints where floats are declared.
    pub fn coerce(&self, expected: HyperType) -> Option<HyperValue> {
        match (self, expected) {
            (HyperValue::Int(v), HyperType::Float) => Some(HyperValue::Float(*v as f64)),
            (value, expected) if value.hyper_type() == expected => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for HyperValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HyperValue::Float(v) => write!(f, "{:?}", v),
            HyperValue::Int(v) => write!(f, "{}", v),
            HyperValue::Bool(v) => write!(f, "{}", v),
            HyperValue::String(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<f64> for HyperValue {
    fn from(value: f64) -> Self {
        HyperValue::Float(value)
    }
}

impl From<i64> for HyperValue {
    fn from(value: i64) -> Self {
        HyperValue::Int(value)
    }
}

impl From<bool> for HyperValue {
    fn from(value: bool) -> Self {
        HyperValue::Bool(value)
    }
}

impl From<&str> for HyperValue {
    fn from(value: &str) -> Self {
        HyperValue::String(value.to_string())
    }
}

/// Schema entry for one hyperparameter.
#[derive(Debug, Clone)]
pub struct HyperparameterSpec {
    pub name: String,
    pub ty: HyperType,
    pub default: Option<HyperValue>,
}

impl HyperparameterSpec {
    /// A hyperparameter every call site must supply.
    pub fn required(name: &str, ty: HyperType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: None,
        }
    }

    /// A hyperparameter that falls back to `default`; the type follows the default.
    pub fn optional(name: &str, default: impl Into<HyperValue>) -> Self {
        let default = default.into();
        Self {
            name: name.to_string(),
            ty: default.hyper_type(),
            default: Some(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Hyperparameter values for one merge node, defaults already applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hyperparameters(BTreeMap<String, HyperValue>);

impl Hyperparameters {
    pub fn new(values: BTreeMap<String, HyperValue>) -> Self {
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&HyperValue> {
        self.0.get(name)
    }

    pub fn float(&self, name: &str) -> Result<f64, MethodError> {
        match self.0.get(name) {
            Some(HyperValue::Float(v)) => Ok(*v),
            Some(HyperValue::Int(v)) => Ok(*v as f64),
            other => Err(Self::missing(name, "float", other)),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64, MethodError> {
        match self.0.get(name) {
            Some(HyperValue::Int(v)) => Ok(*v),
            other => Err(Self::missing(name, "int", other)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, MethodError> {
        match self.0.get(name) {
            Some(HyperValue::Bool(v)) => Ok(*v),
            other => Err(Self::missing(name, "bool", other)),
        }
    }

    pub fn string(&self, name: &str) -> Result<&str, MethodError> {
        match self.0.get(name) {
            Some(HyperValue::String(v)) => Ok(v),
            other => Err(Self::missing(name, "string", other)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HyperValue)> {
        self.0.iter()
    }

    fn missing(name: &str, expected: &str, found: Option<&HyperValue>) -> MethodError {
        let found = found
            .map(|v| v.hyper_type().to_string())
            .unwrap_or_else(|| "nothing".to_string());
        MethodError::Failed(anyhow::anyhow!(
            "hyperparameter '{}' should be {} but is {}",
            name,
            expected,
            found
        ))
    }
}

/// Everything a merge function sees for one output key.
pub struct MergeContext<'a> {
    pub key: &'a str,
    pub inputs: &'a [Option<Arc<Tensor>>],
    pub hyperparameters: &'a Hyperparameters,
}

impl<'a> MergeContext<'a> {
    /// Input `index`, failing with `MissingInput` when it is absent for this key.
    pub fn input(&self, index: usize) -> Result<&'a Tensor, MethodError> {
        match self.inputs.get(index) {
            Some(Some(tensor)) => Ok(tensor.as_ref()),
            _ => Err(MethodError::MissingInput { index }),
        }
    }

    /// Input `index` if present; for methods that tolerate gaps.
    pub fn optional_input(&self, index: usize) -> Option<&'a Tensor> {
        self.inputs.get(index).and_then(|t| t.as_deref())
    }

    /// All inputs, failing on the first absent one.
    pub fn all_inputs(&self) -> Result<Vec<&'a Tensor>, MethodError> {
        (0..self.inputs.len()).map(|i| self.input(i)).collect()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }
}

/// Result of a merge function for one key.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodOutput {
    Tensor(Tensor),
    /// Write nothing for this key. Not a failure.
    Skip,
}

pub type MergeFn =
    Arc<dyn Fn(&MergeContext<'_>) -> Result<MethodOutput, MethodError> + Send + Sync>;

/// A registered merge method. Immutable once registered.
#[derive(Clone)]
pub struct MergeMethodSpec {
    name: String,
    min_inputs: usize,
    max_inputs: Option<usize>,
    hyperparameters: Vec<HyperparameterSpec>,
    input_spaces: Vec<InputSpace>,
    output_space: OutputSpace,
    function: MergeFn,
}

impl MergeMethodSpec {
    /// A method taking exactly `inputs` inputs, all in the same space.
    pub fn new<F>(name: &str, inputs: usize, function: F) -> Self
    where
        F: Fn(&MergeContext<'_>) -> Result<MethodOutput, MethodError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            min_inputs: inputs,
            max_inputs: Some(inputs),
            hyperparameters: Vec::new(),
            input_spaces: Vec::new(),
            output_space: OutputSpace::Same,
            function: Arc::new(function),
        }
    }

    /// Accept `min..=max` inputs; `None` means unbounded.
    pub fn with_arity(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_inputs = min;
        self.max_inputs = max;
        self
    }

    pub fn with_hyperparameter(mut self, spec: HyperparameterSpec) -> Self {
        self.hyperparameters.push(spec);
        self
    }

    /// Per-position input spaces. The last entry repeats for variadic tails.
    pub fn with_input_spaces(mut self, spaces: Vec<InputSpace>) -> Self {
        self.input_spaces = spaces;
        self
    }

    pub fn with_output_space(mut self, space: OutputSpace) -> Self {
        self.output_space = space;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_inputs(&self) -> usize {
        self.min_inputs
    }

    pub fn max_inputs(&self) -> Option<usize> {
        self.max_inputs
    }

    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_inputs && self.max_inputs.map_or(true, |max| count <= max)
    }

    pub fn hyperparameters(&self) -> &[HyperparameterSpec] {
        &self.hyperparameters
    }

    pub fn hyperparameter(&self, name: &str) -> Option<&HyperparameterSpec> {
        self.hyperparameters.iter().find(|h| h.name == name)
    }

    pub fn input_space(&self, index: usize) -> InputSpace {
        self.input_spaces
            .get(index)
            .or_else(|| self.input_spaces.last())
            .copied()
            .unwrap_or(InputSpace::Same)
    }

    pub fn output_space(&self) -> OutputSpace {
        self.output_space
    }

    /// Run the per-key function.
    pub fn apply(&self, ctx: &MergeContext<'_>) -> Result<MethodOutput, MethodError> {
        (self.function)(ctx)
    }
}

impl fmt::Debug for MergeMethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeMethodSpec")
            .field("name", &self.name)
            .field("min_inputs", &self.min_inputs)
            .field("max_inputs", &self.max_inputs)
            .field(
                "hyperparameters",
                &self.hyperparameters.iter().map(|h| &h.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> MergeMethodSpec {
        MergeMethodSpec::new("identity", 1, |ctx| {
            Ok(MethodOutput::Tensor(ctx.input(0)?.clone()))
        })
    }

    #[test]
    fn test_arity_bounds() {
        let spec = identity().with_arity(2, None);
        assert!(!spec.accepts_arity(1));
        assert!(spec.accepts_arity(2));
        assert!(spec.accepts_arity(50));

        let spec = identity().with_arity(1, Some(3));
        assert!(spec.accepts_arity(3));
        assert!(!spec.accepts_arity(4));
    }

    #[test]
    fn test_input_space_repeats_last_entry() {
        let spec = identity()
            .with_arity(1, None)
            .with_input_spaces(vec![InputSpace::Base, InputSpace::Delta]);
        assert_eq!(spec.input_space(0), InputSpace::Base);
        assert_eq!(spec.input_space(1), InputSpace::Delta);
        assert_eq!(spec.input_space(7), InputSpace::Delta);
        assert_eq!(identity().input_space(0), InputSpace::Same);
    }

    #[test]
    fn test_int_coerces_to_float_only() {
        assert_eq!(
            HyperValue::Int(2).coerce(HyperType::Float),
            Some(HyperValue::Float(2.0))
        );
        assert_eq!(HyperValue::Float(2.0).coerce(HyperType::Int), None);
        assert_eq!(HyperValue::Bool(true).coerce(HyperType::String), None);
    }

    #[test]
    fn test_missing_input_reports_index() {
        let hyper = Hyperparameters::default();
        let inputs = vec![Some(Arc::new(Tensor::scalar(1.0))), None];
        let ctx = MergeContext {
            key: "k",
            inputs: &inputs,
            hyperparameters: &hyper,
        };
        assert!(ctx.input(0).is_ok());
        assert!(matches!(ctx.input(1), Err(MethodError::MissingInput { index: 1 })));
        assert!(ctx.optional_input(1).is_none());
        assert!(ctx.all_inputs().is_err());
    }

    #[test]
    fn test_float_display_round_trips() {
        for value in [0.1, 1.0, -2.5e-7, 1e21, 123456.789] {
            let text = HyperValue::Float(value).to_string();
            assert!(text.contains('.') || text.contains('e'), "{}", text);
            assert_eq!(text.parse::<f64>().unwrap(), value);
        }
    }
}
