// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    BUFFERED_KEYS_PER_WORKER, DEFAULT_SIMILARITY_THRESHOLD, FALLBACK_CONCURRENCY,
};
use crate::errors::{ConfigError, FailurePolicy};
use crate::registry::ArchitectureSchema;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for the merge engine.
///
/// Every field is optional; an empty file yields the defaults.
///
/// # Example
/// ```yaml
/// strategy: worker_pool
/// failure_policy: collect_and_continue
/// ordering: declared
/// resolver:
///   similarity_threshold: 0.7
/// executor_options:
///   max_concurrency: 8
///   max_buffered_keys: 32
/// architectures:
///   - schemas/sd1.yaml
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub ordering: OrderingMode,
    #[serde(default)]
    pub resolver: ResolverOptions,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    /// Architecture schema files to register. Relative paths are resolved
    /// against the directory of the config file by [`load_config`].
    #[serde(default)]
    pub architectures: Vec<PathBuf>,
}

/// Execution strategy for walking the key universe.
///
/// # Variants
/// * `Sequential` - One key at a time, in order
/// * `WorkerPool` - Bounded pool of blocking workers with ordered output
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Sequential,
    #[default]
    WorkerPool,
}

/// Order in which output keys are produced.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderingMode {
    /// First-seen order walking the leaves depth-first.
    #[default]
    Declared,
    Lexicographic,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResolverOptions {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Executor-specific configuration options.
///
/// # Fields
/// * `max_concurrency` - Worker count (defaults to available parallelism)
/// * `max_buffered_keys` - Bound on in-flight plus unwritten keys
///   (defaults to a small multiple of the worker count)
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
    pub max_buffered_keys: Option<usize>,
}

impl ExecutorOptions {
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_CONCURRENCY)
        })
    }

    pub fn effective_buffer(&self) -> usize {
        self.max_buffered_keys
            .unwrap_or_else(|| self.effective_concurrency() * BUFFERED_KEYS_PER_WORKER)
    }
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // An empty document parses as null rather than an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.resolver.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "resolver.similarity_threshold must be within 0..=1, got {}",
                threshold
            )));
        }
        if self.executor_options.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid(
                "executor_options.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.executor_options.max_buffered_keys == Some(0) {
            return Err(ConfigError::Invalid(
                "executor_options.max_buffered_keys must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|error| ConfigError::Io {
        path: path.to_path_buf(),
        error,
    })
}

pub(crate) fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

/// Load an engine config from a YAML file, or TOML when the extension is `.toml`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = read_file(path)?;
    let mut cfg = if is_toml(path) {
        EngineConfig::from_toml_str(&content)?
    } else {
        EngineConfig::from_yaml_str(&content)?
    };

    if let Some(dir) = path.parent() {
        for schema in &mut cfg.architectures {
            if schema.is_relative() {
                *schema = dir.join(&*schema);
            }
        }
    }
    Ok(cfg)
}

/// Load and validate an architecture schema file.
pub fn load_architecture<P: AsRef<Path>>(path: P) -> Result<ArchitectureSchema, ConfigError> {
    let path = path.as_ref();
    let content = read_file(path)?;
    let schema: ArchitectureSchema = if is_toml(path) {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    schema.validate()?;
    Ok(schema)
}
