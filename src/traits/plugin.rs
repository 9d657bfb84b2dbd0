// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::registry::ExtensionRegistry;

/// A bundle of merge methods and architectures installed in one call.
///
/// Plugins run while the registry is still mutable. Returning an error aborts
/// the install; a [`RegistryError`](crate::errors::RegistryError) is passed
/// through unchanged, anything else is wrapped as `RegistryError::Plugin`.
pub trait ExtensionPlugin {
    fn name(&self) -> &str;

    fn register(&self, registry: &mut ExtensionRegistry) -> anyhow::Result<()>;
}
