// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{SinkError, SourceError};
use crate::tensor::Tensor;
use crate::traits::{OutputSink, RunStatus, TensorSource};

/// Source backed by a map held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    id: String,
    tensors: BTreeMap<String, Tensor>,
}

impl InMemorySource {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tensors: BTreeMap::new(),
        }
    }

    pub fn with_tensor(mut self, key: &str, tensor: Tensor) -> Self {
        self.insert(key, tensor);
        self
    }

    pub fn insert(&mut self, key: &str, tensor: Tensor) {
        self.tensors.insert(key.to_string(), tensor);
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl TensorSource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn list_keys(&self) -> Result<BTreeSet<String>, SourceError> {
        Ok(self.tensors.keys().cloned().collect())
    }

    fn get(&self, key: &str) -> Result<Option<Tensor>, SourceError> {
        Ok(self.tensors.get(key).cloned())
    }
}

/// Sink collecting merged tensors in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    tensors: Vec<(String, Tensor)>,
    status: Option<RunStatus>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in the order they were written.
    pub fn keys(&self) -> Vec<&str> {
        self.tensors.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&Tensor> {
        self.tensors.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    pub fn entries(&self) -> &[(String, Tensor)] {
        &self.tensors
    }

    /// `None` until the sink has been finalized.
    pub fn status(&self) -> Option<&RunStatus> {
        self.status.as_ref()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn put(&mut self, key: &str, tensor: Tensor) -> Result<(), SinkError> {
        if self.status.is_some() {
            return Err(SinkError::Closed);
        }
        self.tensors.push((key.to_string(), tensor));
        Ok(())
    }

    async fn finalize(&mut self, status: RunStatus) -> Result<(), SinkError> {
        if self.status.is_some() {
            return Err(SinkError::Closed);
        }
        self.status = Some(status);
        Ok(())
    }
}
