// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ExtensionKind;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A method or architecture was added to the registry.
pub struct ExtensionRegistered<'a> {
    pub kind: ExtensionKind,
    pub name: &'a str,
}

impl Display for ExtensionRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Registered {} '{}'", self.kind, self.name)
    }
}

impl StructuredLog for ExtensionRegistered<'_> {
    fn log(&self) {
        tracing::debug!(kind = %self.kind, name = self.name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "extension_registered",
            span_name = name,
            kind = %self.kind,
            name = self.name,
        )
    }
}

/// A plugin finished registering its extensions.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PluginInstalled<'a> {
    pub plugin: &'a str,
    pub methods: usize,
    pub architectures: usize,
}

impl Display for PluginInstalled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Installed plugin '{}': {} methods, {} architectures",
            self.plugin, self.methods, self.architectures
        )
    }
}

impl StructuredLog for PluginInstalled<'_> {
    fn log(&self) {
        tracing::info!(
            plugin = self.plugin,
            methods = self.methods,
            architectures = self.architectures,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "plugin_installed",
            span_name = name,
            plugin = self.plugin,
            methods = self.methods,
            architectures = self.architectures,
        )
    }
}

/// The registry became read-only.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use mergewood::observability::messages::registry::RegistryFrozen;
///
/// let msg = RegistryFrozen {
///     methods: 6,
///     architectures: 2,
/// };
///
/// assert_eq!(msg.to_string(), "Registry frozen with 6 methods and 2 architectures");
/// ```
pub struct RegistryFrozen {
    pub methods: usize,
    pub architectures: usize,
}

impl Display for RegistryFrozen {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registry frozen with {} methods and {} architectures",
            self.methods, self.architectures
        )
    }
}

impl StructuredLog for RegistryFrozen {
    fn log(&self) {
        tracing::info!(
            methods = self.methods,
            architectures = self.architectures,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "registry_frozen",
            span_name = name,
            methods = self.methods,
            architectures = self.architectures,
        )
    }
}
