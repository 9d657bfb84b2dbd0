// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::document::load_recipe_document;
use crate::config::loader::{load_architecture, load_config};
use crate::config::{EngineConfig, OrderingMode};
use crate::engine::{EvaluationPlan, ExecutorFactory, MergeReport};
use crate::errors::{ConfigError, EvaluationError, FailurePolicy, RecipeError};
use crate::io::SourceCatalog;
use crate::recipe::{parse, Recipe, RecipeBuilder};
use crate::registry::{ExtensionRegistry, Registry};
use crate::resolver::KeyResolver;
use crate::traits::{KeyExecutor, OutputSink};

/// Everything needed to turn recipes into merged output.
///
/// Holds the frozen registry, the configured executor and the resolution
/// settings. Built by [`RuntimeBuilder`].
pub struct MergeRuntime {
    registry: Registry,
    executor: Box<dyn KeyExecutor>,
    resolver: KeyResolver,
    failure_policy: FailurePolicy,
    ordering: OrderingMode,
}

impl MergeRuntime {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Builder bound to this runtime's registry.
    pub fn recipe_builder(&self) -> RecipeBuilder {
        RecipeBuilder::new(self.registry.clone())
    }

    pub fn executor(&self) -> &dyn KeyExecutor {
        self.executor.as_ref()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Parse recipe text against this runtime's registry.
    pub fn parse_recipe(&self, text: &str) -> Result<Recipe, RecipeError> {
        parse(text, &self.recipe_builder())
    }

    /// Load, validate and build a YAML or TOML recipe document.
    pub fn load_recipe<P: AsRef<Path>>(&self, path: P) -> Result<Recipe, RecipeError> {
        load_recipe_document(path)?.build(&self.recipe_builder())
    }

    /// Resolve sources and align keys for `recipe` without evaluating it.
    pub fn plan(
        &self,
        recipe: &Recipe,
        catalog: &SourceCatalog,
    ) -> Result<EvaluationPlan, EvaluationError> {
        EvaluationPlan::build(recipe, catalog, &self.resolver, self.ordering)
    }

    pub async fn merge(
        &self,
        recipe: &Recipe,
        catalog: &SourceCatalog,
        sink: &mut dyn OutputSink,
    ) -> Result<MergeReport, EvaluationError> {
        self.merge_with_cancellation(recipe, catalog, sink, CancellationToken::new())
            .await
    }

    /// Merge `recipe` into `sink`, stopping dispatch when `cancel` fires.
    pub async fn merge_with_cancellation(
        &self,
        recipe: &Recipe,
        catalog: &SourceCatalog,
        sink: &mut dyn OutputSink,
        cancel: CancellationToken,
    ) -> Result<MergeReport, EvaluationError> {
        let plan = Arc::new(self.plan(recipe, catalog)?);
        self.executor
            .execute_with_cancellation(plan, sink, self.failure_policy, cancel)
            .await
    }
}

/// Merge runtime builder - orchestrates registry, resolver and executor creation from configuration.
///
/// # Examples
///
/// ```
/// use mergewood::config::{EngineConfig, RuntimeBuilder};
/// use mergewood::registry::ExtensionRegistry;
/// use mergewood::traits::KeyExecutor;
///
/// let registry = ExtensionRegistry::with_builtins().unwrap();
/// let runtime = RuntimeBuilder::from_config(&EngineConfig::default(), registry).unwrap();
///
/// assert_eq!(runtime.executor().strategy(), "worker_pool");
/// assert!(runtime.registry().lookup_method("weighted_sum").is_ok());
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build a runtime from configuration.
    ///
    /// Registers the configured architecture schemas into `registry`, freezes
    /// it, and creates the executor for the configured strategy.
    pub fn from_config(
        cfg: &EngineConfig,
        mut registry: ExtensionRegistry,
    ) -> Result<MergeRuntime, ConfigError> {
        cfg.validate()?;
        for path in &cfg.architectures {
            registry.register_architecture(load_architecture(path)?)?;
        }

        Ok(MergeRuntime {
            registry: registry.freeze(),
            executor: ExecutorFactory::from_config(cfg),
            resolver: KeyResolver::new(cfg.resolver.similarity_threshold),
            failure_policy: cfg.failure_policy,
            ordering: cfg.ordering,
        })
    }

    /// Load a config file and build a runtime with the built-in methods.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<MergeRuntime, ConfigError> {
        let cfg = load_config(path)?;
        Self::from_config(&cfg, ExtensionRegistry::with_builtins()?)
    }
}
