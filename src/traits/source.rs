// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use crate::errors::SourceError;
use crate::tensor::Tensor;

/// Read-only view over one named weight archive.
///
/// The engine never decodes archive formats itself; hosts wrap whatever
/// storage they have behind this trait. Implementations are shared across
/// worker threads and must tolerate concurrent `get` calls.
///
/// `get` is synchronous because key evaluation runs on blocking threads.
pub trait TensorSource: Send + Sync {
    /// Identifier that recipe leaves use to refer to this source.
    fn id(&self) -> &str;

    /// Every key stored in the archive.
    fn list_keys(&self) -> Result<BTreeSet<String>, SourceError>;

    /// Fetch one tensor; `Ok(None)` when the key is not stored.
    fn get(&self, key: &str) -> Result<Option<Tensor>, SourceError>;
}
