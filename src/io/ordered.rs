// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use crate::errors::SinkError;
use crate::tensor::Tensor;
use crate::traits::OutputSink;

/// Reorders out-of-order key completions into key-universe order.
///
/// Workers finish keys in any order. Each completion is parked under its
/// key index until every lower index has completed, then flushed to the
/// inner sink. Skipped and failed keys complete with no tensor so the flush
/// can move past them. Anything still parked when the sink is dropped was
/// never written.
pub struct OrderedSink<'s> {
    inner: &'s mut dyn OutputSink,
    next: usize,
    pending: BTreeMap<usize, Option<(String, Tensor)>>,
    peak: usize,
}

impl<'s> OrderedSink<'s> {
    pub fn new(inner: &'s mut dyn OutputSink) -> Self {
        Self {
            inner,
            next: 0,
            pending: BTreeMap::new(),
            peak: 0,
        }
    }

    /// Record the result for key `index` and flush whatever became contiguous.
    pub async fn complete(
        &mut self,
        index: usize,
        key: &str,
        tensor: Option<Tensor>,
    ) -> Result<(), SinkError> {
        self.pending
            .insert(index, tensor.map(|t| (key.to_string(), t)));
        self.peak = self.peak.max(self.pending.len());

        while let Some(entry) = self.pending.remove(&self.next) {
            if let Some((key, tensor)) = entry {
                self.inner.put(&key, tensor).await?;
            }
            self.next += 1;
        }
        Ok(())
    }

    /// Completed keys waiting on a lower index.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Largest number of keys ever parked at once.
    pub fn peak_pending(&self) -> usize {
        self.peak
    }

    /// Number of indices flushed so far.
    pub fn flushed(&self) -> usize {
        self.next
    }
}
