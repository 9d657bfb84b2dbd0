// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sign-aware combination of several deltas.

use crate::errors::MethodError;
use crate::registry::{
    HyperparameterSpec, InputSpace, MergeContext, MergeMethodSpec, MethodOutput, OutputSpace,
};
use crate::tensor::Tensor;

/// TIES merging: trim each delta to its top `k` fraction by magnitude, elect
/// a sign per element, then average the entries that agree with it.
pub fn ties_sum() -> MergeMethodSpec {
    MergeMethodSpec::new("ties_sum", 1, |ctx: &MergeContext<'_>| {
        let k = fraction(ctx, "k")?;
        let deltas = ctx.all_inputs()?;
        let first = deltas[0];
        for delta in &deltas[1..] {
            first.check_same_shape(delta)?;
        }

        let trimmed: Vec<Vec<f32>> = deltas.iter().map(|d| top_k(d.data(), k)).collect();
        let data = (0..first.numel())
            .map(|i| {
                let column = trimmed.iter().map(|values| values[i]);
                let elected = column.clone().sum::<f32>().signum();
                let (sum, count) = column
                    .filter(|v| *v != 0.0 && v.signum() == elected)
                    .fold((0.0f32, 0usize), |(sum, count), v| (sum + v, count + 1));
                if count == 0 {
                    0.0
                } else {
                    sum / count as f32
                }
            })
            .collect();

        Ok(MethodOutput::Tensor(Tensor::new(
            first.dtype(),
            first.shape().to_vec(),
            data,
        )?))
    })
    .with_arity(1, None)
    .with_hyperparameter(HyperparameterSpec::optional("k", 0.2))
    .with_input_spaces(vec![InputSpace::Delta])
    .with_output_space(OutputSpace::Delta)
}

/// Per element, the delta entry with the largest magnitude.
pub fn select_max_delta() -> MergeMethodSpec {
    MergeMethodSpec::new("select_max_delta", 1, |ctx: &MergeContext<'_>| {
        let deltas = ctx.all_inputs()?;
        let mut selected = deltas[0].clone();
        for delta in &deltas[1..] {
            selected = selected.zip_map(delta, |a, b| if b.abs() > a.abs() { b } else { a })?;
        }
        Ok(MethodOutput::Tensor(selected))
    })
    .with_arity(1, None)
    .with_input_spaces(vec![InputSpace::Delta])
    .with_output_space(OutputSpace::Delta)
}

fn fraction(ctx: &MergeContext<'_>, name: &str) -> Result<f32, MethodError> {
    let value = ctx.hyperparameters.float(name)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(MethodError::Incompatible(format!(
            "'{}' must be within 0..=1, got {}",
            name, value
        )));
    }
    Ok(value as f32)
}

/// Zero everything except the `k` fraction of entries with the largest magnitude.
fn top_k(values: &[f32], k: f32) -> Vec<f32> {
    let keep = ((values.len() as f32) * k).ceil() as usize;
    if keep >= values.len() {
        return values.to_vec();
    }
    if keep == 0 {
        return vec![0.0; values.len()];
    }

    let mut magnitudes: Vec<f32> = values.iter().map(|v| v.abs()).collect();
    magnitudes.sort_unstable_by(|a, b| b.total_cmp(a));
    let cutoff = magnitudes[keep - 1];
    values
        .iter()
        .map(|&v| if v.abs() >= cutoff { v } else { 0.0 })
        .collect()
}
