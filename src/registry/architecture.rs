// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::collections::HashSet;

use crate::errors::RegistryError;

/// A named group of keys sharing a prefix, e.g. a text encoder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentGroup {
    pub name: String,
    pub prefix: String,
}

/// Canonical key set of a model architecture.
///
/// Schemas drive key alignment and reporting only. Key order is the order
/// in which merged tensors are written.
///
/// # Example
/// ```yaml
/// name: tiny
/// keys:
///   - encoder.weight
///   - decoder.weight
/// components:
///   - name: encoder
///     prefix: encoder.
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArchitectureSchema {
    pub name: String,
    pub keys: Vec<String>,
    #[serde(default)]
    pub components: Vec<ComponentGroup>,
}

impl ArchitectureSchema {
    pub fn new<I, S>(name: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            keys: keys.into_iter().map(Into::into).collect(),
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, name: &str, prefix: &str) -> Self {
        self.components.push(ComponentGroup {
            name: name.to_string(),
            prefix: prefix.to_string(),
        });
        self
    }

    /// Canonical keys must be unique and component names distinct.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        for key in &self.keys {
            if !seen.insert(key.as_str()) {
                return Err(RegistryError::InvalidSchema {
                    name: self.name.clone(),
                    reason: format!("canonical key '{}' is listed twice", key),
                });
            }
        }

        let mut components = HashSet::new();
        for component in &self.components {
            if !components.insert(component.name.as_str()) {
                return Err(RegistryError::InvalidSchema {
                    name: self.name.clone(),
                    reason: format!("component '{}' is listed twice", component.name),
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Component owning `key`, chosen by longest matching prefix.
    pub fn component_of(&self, key: &str) -> Option<&str> {
        self.components
            .iter()
            .filter(|c| key.starts_with(&c.prefix))
            .max_by_key(|c| c.prefix.len())
            .map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_keys_rejected() {
        let schema = ArchitectureSchema::new("dup", ["a", "b", "a"]);
        assert!(matches!(
            schema.validate(),
            Err(RegistryError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_component_uses_longest_prefix() {
        let schema = ArchitectureSchema::new("m", ["model.unet.in.weight"])
            .with_component("model", "model.")
            .with_component("unet", "model.unet.");
        assert_eq!(schema.component_of("model.unet.in.weight"), Some("unet"));
        assert_eq!(schema.component_of("model.vae.weight"), Some("model"));
        assert_eq!(schema.component_of("other"), None);
    }

    #[test]
    fn test_schema_from_yaml() {
        let yaml = r#"
name: tiny
keys: [encoder.weight, decoder.weight]
components:
  - name: encoder
    prefix: encoder.
"#;
        let schema: ArchitectureSchema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema.keys.len(), 2);
        assert!(schema.validate().is_ok());
        assert_eq!(schema.component_of("encoder.weight"), Some("encoder"));
    }
}
