// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for extension registration and lookup.

use std::fmt;
use thiserror::Error;

/// The two kinds of extension the registry catalogues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Method,
    Architecture,
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionKind::Method => f.write_str("merge method"),
            ExtensionKind::Architecture => f.write_str("architecture"),
        }
    }
}

/// Errors that can occur while populating or querying the extension registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An extension with the same name is already registered.
    #[error("{kind} '{name}' is already registered")]
    DuplicateName { kind: ExtensionKind, name: String },

    /// No extension with this name exists.
    #[error("{kind} '{name}' is not registered")]
    NotFound { kind: ExtensionKind, name: String },

    /// The name cannot be written in recipe text.
    #[error("'{name}' is not a valid {kind} name: {reason}")]
    InvalidName {
        kind: ExtensionKind,
        name: String,
        reason: &'static str,
    },

    /// An architecture schema is internally inconsistent.
    #[error("architecture '{name}' is invalid: {reason}")]
    InvalidSchema { name: String, reason: String },

    /// A plugin failed while registering its extensions.
    #[error("plugin '{plugin}' failed to register: {error}")]
    Plugin {
        plugin: String,
        #[source]
        error: anyhow::Error,
    },
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}
