// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Linear combinations and differences of model weights.

use crate::registry::{
    HyperparameterSpec, InputSpace, MergeContext, MergeMethodSpec, MethodOutput,
    OutputSpace,
};
use crate::tensor::Tensor;

/// `(1 - alpha) * a + alpha * b`
pub fn weighted_sum() -> MergeMethodSpec {
    MergeMethodSpec::new("weighted_sum", 2, |ctx: &MergeContext<'_>| {
        let alpha = ctx.hyperparameters.float("alpha")? as f32;
        let merged = ctx.input(0)?.lerp(ctx.input(1)?, alpha)?;
        Ok(MethodOutput::Tensor(merged))
    })
    .with_hyperparameter(HyperparameterSpec::optional("alpha", 0.5))
}

/// Element-wise mean of any number of models.
pub fn n_average() -> MergeMethodSpec {
    MergeMethodSpec::new("n_average", 1, |ctx: &MergeContext<'_>| {
        let inputs = ctx.all_inputs()?;
        let mut total = inputs[0].clone();
        for tensor in &inputs[1..] {
            total = total.add(tensor)?;
        }
        let count = inputs.len() as f32;
        Ok(MethodOutput::Tensor(total.map(|v| v / count)))
    })
    .with_arity(1, None)
}

/// `base + alpha * delta`
pub fn add_difference() -> MergeMethodSpec {
    MergeMethodSpec::new("add_difference", 2, |ctx: &MergeContext<'_>| {
        let alpha = ctx.hyperparameters.float("alpha")? as f32;
        let merged = ctx.input(0)?.add(&ctx.input(1)?.scale(alpha))?;
        Ok(MethodOutput::Tensor(merged))
    })
    .with_hyperparameter(HyperparameterSpec::optional("alpha", 1.0))
    .with_input_spaces(vec![InputSpace::Base, InputSpace::Delta])
    .with_output_space(OutputSpace::Base)
}

/// `a - b`, producing a delta.
pub fn subtract() -> MergeMethodSpec {
    MergeMethodSpec::new("subtract", 2, |ctx: &MergeContext<'_>| {
        Ok(MethodOutput::Tensor(ctx.input(0)?.sub(ctx.input(1)?)?))
    })
    .with_input_spaces(vec![InputSpace::Base, InputSpace::Base])
    .with_output_space(OutputSpace::Delta)
}

/// Part of `b` orthogonal to `a`.
pub fn perpendicular_component() -> MergeMethodSpec {
    MergeMethodSpec::new("perpendicular_component", 2, |ctx: &MergeContext<'_>| {
        let a = ctx.input(0)?;
        let b = ctx.input(1)?;
        let norm_sq = a.dot(a)?;
        if norm_sq == 0.0 {
            return Ok(MethodOutput::Tensor(b.clone()));
        }
        let projection = (a.dot(b)? / norm_sq) as f32;
        Ok(MethodOutput::Tensor(b.sub(&a.scale(projection))?))
    })
}

/// Delta `b - c`, rescaled per element by how far `b` moved away from `a`.
pub fn train_difference() -> MergeMethodSpec {
    MergeMethodSpec::new("train_difference", 3, |ctx: &MergeContext<'_>| {
        let alpha = ctx.hyperparameters.float("alpha")? as f32;
        let a = ctx.input(0)?;
        let b = ctx.input(1)?;
        let c = ctx.input(2)?;
        a.check_same_shape(b)?;
        b.check_same_shape(c)?;

        let data = a
            .data()
            .iter()
            .zip(b.data())
            .zip(c.data())
            .map(|((&a, &b), &c)| {
                let diff = b - c;
                let to_a = (b - a).abs();
                let total = diff.abs() + to_a;
                let scale = if total == 0.0 { 0.0 } else { to_a / total };
                diff.signum() * scale * diff.abs() * alpha
            })
            .collect();
        Ok(MethodOutput::Tensor(Tensor::new(
            b.dtype(),
            b.shape().to_vec(),
            data,
        )?))
    })
    .with_hyperparameter(HyperparameterSpec::optional("alpha", 1.0))
    .with_input_spaces(vec![InputSpace::Base])
    .with_output_space(OutputSpace::Delta)
}

/// Clamp `value` element-wise between `lower` and `upper`.
///
/// Bounds may be rank-0, which is how literal parameters arrive.
pub fn clamp() -> MergeMethodSpec {
    MergeMethodSpec::new("clamp", 3, |ctx: &MergeContext<'_>| {
        let lower = ctx.input(1)?;
        let upper = ctx.input(2)?;
        let clamped = ctx
            .input(0)?
            .zip_map(lower, f32::max)?
            .zip_map(upper, f32::min)?;
        Ok(MethodOutput::Tensor(clamped))
    })
}
