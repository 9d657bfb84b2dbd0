// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Extension registry for merge methods and architectures.
//!
//! The registry has two phases. An [`ExtensionRegistry`] is populated at
//! startup, directly or through [`ExtensionPlugin`]s, then consumed by
//! [`ExtensionRegistry::freeze`] into a read-only [`Registry`] handle. Recipe
//! construction and evaluation only accept the frozen form, so nothing can
//! register while a merge is running.
//!
//! # Example
//! ```rust
//! use mergewood::registry::{ExtensionRegistry, ArchitectureSchema};
//!
//! let mut registry = ExtensionRegistry::with_builtins().unwrap();
//! registry
//!     .register_architecture(ArchitectureSchema::new("tiny", ["a.weight", "b.weight"]))
//!     .unwrap();
//! let registry = registry.freeze();
//!
//! assert!(registry.lookup_method("weighted_sum").is_ok());
//! assert!(registry.lookup_architecture("tiny").is_ok());
//! ```

mod architecture;
mod method;

pub use architecture::{ArchitectureSchema, ComponentGroup};
pub use method::{
    HyperType, HyperValue, HyperparameterSpec, Hyperparameters, InputSpace, MergeContext,
    MergeFn, MergeMethodSpec, MergeSpace, MethodOutput, OutputSpace,
};

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{ExtensionKind, RegistryError};
use crate::methods::BuiltinMethods;
use crate::observability::messages::registry::{
    ExtensionRegistered, PluginInstalled, RegistryFrozen,
};
use crate::observability::messages::StructuredLog;
use crate::traits::ExtensionPlugin;

/// Words with fixed meaning in recipe text.
pub const RESERVED_WORDS: &[&str] = &["leaf", "true", "false"];

/// True when `name` can be written as an identifier in recipe text.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_name(kind: ExtensionKind, name: &str) -> Result<(), RegistryError> {
    if !is_identifier(name) {
        return Err(RegistryError::InvalidName {
            kind,
            name: name.to_string(),
            reason: "names must match [A-Za-z_][A-Za-z0-9_]*",
        });
    }
    if RESERVED_WORDS.contains(&name) {
        return Err(RegistryError::InvalidName {
            kind,
            name: name.to_string(),
            reason: "name is reserved by the recipe language",
        });
    }
    Ok(())
}

/// Mutable registry used during startup.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    methods: HashMap<String, Arc<MergeMethodSpec>>,
    architectures: HashMap<String, Arc<ArchitectureSchema>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in method catalogue.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.install(&BuiltinMethods)?;
        Ok(registry)
    }

    pub fn register_method(&mut self, spec: MergeMethodSpec) -> Result<(), RegistryError> {
        validate_name(ExtensionKind::Method, spec.name())?;
        if self.methods.contains_key(spec.name()) {
            return Err(RegistryError::DuplicateName {
                kind: ExtensionKind::Method,
                name: spec.name().to_string(),
            });
        }
        ExtensionRegistered {
            kind: ExtensionKind::Method,
            name: spec.name(),
        }
        .log();
        self.methods.insert(spec.name().to_string(), Arc::new(spec));
        Ok(())
    }

    pub fn register_architecture(
        &mut self,
        schema: ArchitectureSchema,
    ) -> Result<(), RegistryError> {
        validate_name(ExtensionKind::Architecture, &schema.name)?;
        if self.architectures.contains_key(&schema.name) {
            return Err(RegistryError::DuplicateName {
                kind: ExtensionKind::Architecture,
                name: schema.name.clone(),
            });
        }
        schema.validate()?;
        ExtensionRegistered {
            kind: ExtensionKind::Architecture,
            name: &schema.name,
        }
        .log();
        self.architectures
            .insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    pub fn lookup_method(&self, name: &str) -> Result<Arc<MergeMethodSpec>, RegistryError> {
        lookup(&self.methods, ExtensionKind::Method, name)
    }

    pub fn lookup_architecture(
        &self,
        name: &str,
    ) -> Result<Arc<ArchitectureSchema>, RegistryError> {
        lookup(&self.architectures, ExtensionKind::Architecture, name)
    }

    /// Let `plugin` register its extensions.
    pub fn install(&mut self, plugin: &dyn ExtensionPlugin) -> Result<(), RegistryError> {
        let methods_before = self.methods.len();
        let architectures_before = self.architectures.len();

        plugin
            .register(self)
            .map_err(|error| match error.downcast::<RegistryError>() {
                Ok(registry_error) => registry_error,
                Err(error) => RegistryError::Plugin {
                    plugin: plugin.name().to_string(),
                    error,
                },
            })?;

        PluginInstalled {
            plugin: plugin.name(),
            methods: self.methods.len() - methods_before,
            architectures: self.architectures.len() - architectures_before,
        }
        .log();
        Ok(())
    }

    /// End the registration phase.
    pub fn freeze(self) -> Registry {
        RegistryFrozen {
            methods: self.methods.len(),
            architectures: self.architectures.len(),
        }
        .log();
        Registry {
            inner: Arc::new(self),
        }
    }
}

/// Frozen, cheaply clonable registry handle.
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<ExtensionRegistry>,
}

impl Registry {
    pub fn lookup_method(&self, name: &str) -> Result<Arc<MergeMethodSpec>, RegistryError> {
        self.inner.lookup_method(name)
    }

    pub fn lookup_architecture(
        &self,
        name: &str,
    ) -> Result<Arc<ArchitectureSchema>, RegistryError> {
        self.inner.lookup_architecture(name)
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        sorted_names(&self.inner.methods)
    }

    /// Registered architecture names, sorted.
    pub fn architecture_names(&self) -> Vec<&str> {
        sorted_names(&self.inner.architectures)
    }
}

fn lookup<T>(
    map: &HashMap<String, Arc<T>>,
    kind: ExtensionKind,
    name: &str,
) -> Result<Arc<T>, RegistryError> {
    map.get(name).cloned().ok_or_else(|| RegistryError::NotFound {
        kind,
        name: name.to_string(),
    })
}

fn sorted_names<T>(map: &HashMap<String, T>) -> Vec<&str> {
    let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}
