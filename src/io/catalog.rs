// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::TensorSource;

/// Sources available to a merge, keyed by the id leaves refer to.
#[derive(Clone, Default)]
pub struct SourceCatalog {
    sources: HashMap<String, Arc<dyn TensorSource>>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source under its own id, replacing any source with the same id.
    pub fn insert(&mut self, source: Arc<dyn TensorSource>) {
        self.sources.insert(source.id().to_string(), source);
    }

    pub fn with_source(mut self, source: impl TensorSource + 'static) -> Self {
        self.insert(Arc::new(source));
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn TensorSource>> {
        self.sources.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.sources.keys()
    }
}

impl std::fmt::Debug for SourceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCatalog")
            .field("source_count", &self.sources.len())
            .field("source_ids", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}
