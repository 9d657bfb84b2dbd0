// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod document;
mod loader;
mod runtime;
mod validation;

pub mod consts;

pub use document::{load_recipe_document, LiteralValue, NodeSpec, RecipeDocument};
pub use loader::{
    load_architecture, load_config, EngineConfig, ExecutorOptions, OrderingMode,
    ResolverOptions, Strategy,
};
pub use runtime::{MergeRuntime, RuntimeBuilder};
pub use validation::validate_recipe_document;
