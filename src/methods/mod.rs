// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in merge methods, installed as a plugin.

pub mod arithmetic;
pub mod selection;
pub mod ties;

use crate::registry::{ExtensionRegistry, MergeMethodSpec};
use crate::traits::ExtensionPlugin;

/// Plugin registering the built-in method catalogue.
pub struct BuiltinMethods;

impl BuiltinMethods {
    pub fn specs() -> Vec<MergeMethodSpec> {
        vec![
            arithmetic::weighted_sum(),
            arithmetic::n_average(),
            arithmetic::add_difference(),
            arithmetic::subtract(),
            arithmetic::perpendicular_component(),
            arithmetic::train_difference(),
            arithmetic::clamp(),
            ties::ties_sum(),
            ties::select_max_delta(),
            selection::fallback(),
            selection::key_filter(),
        ]
    }
}

impl ExtensionPlugin for BuiltinMethods {
    fn name(&self) -> &str {
        "builtin"
    }

    fn register(&self, registry: &mut ExtensionRegistry) -> anyhow::Result<()> {
        for spec in Self::specs() {
            registry.register_method(spec)?;
        }
        Ok(())
    }
}
