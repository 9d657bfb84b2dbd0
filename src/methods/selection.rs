// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Methods that choose between inputs or drop keys instead of combining values.

use crate::errors::MethodError;
use crate::registry::{HyperparameterSpec, MergeContext, MergeMethodSpec, MethodOutput};

/// First input if present for this key, otherwise the second.
pub fn fallback() -> MergeMethodSpec {
    MergeMethodSpec::new("fallback", 2, |ctx: &MergeContext<'_>| {
        match ctx.optional_input(0).or_else(|| ctx.optional_input(1)) {
            Some(tensor) => Ok(MethodOutput::Tensor(tensor.clone())),
            None => Err(MethodError::MissingInput { index: 0 }),
        }
    })
}

/// Pass the input through when the key starts with `prefix`, skip it otherwise.
/// `exclude = true` inverts the test.
pub fn key_filter() -> MergeMethodSpec {
    MergeMethodSpec::new("key_filter", 1, |ctx: &MergeContext<'_>| {
        let prefix = ctx.hyperparameters.string("prefix")?;
        let exclude = ctx.hyperparameters.bool("exclude")?;
        if ctx.key.starts_with(prefix) == exclude {
            return Ok(MethodOutput::Skip);
        }
        Ok(MethodOutput::Tensor(ctx.input(0)?.clone()))
    })
    .with_hyperparameter(HyperparameterSpec::optional("prefix", ""))
    .with_hyperparameter(HyperparameterSpec::optional("exclude", false))
}
