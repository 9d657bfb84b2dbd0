// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod recipe;
mod registry;

pub use config::ConfigError;
pub use execution::{
    EvaluationError, FailurePolicy, KeyError, MethodError, SinkError, SourceError,
};
pub use recipe::RecipeError;
pub use registry::{ExtensionKind, RegistryError};
