// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory sources and sinks, the source catalog and the ordering buffer.

mod catalog;
mod memory;
mod ordered;

pub use catalog::SourceCatalog;
pub use memory::{InMemorySource, MemorySink};
pub use ordered::OrderedSink;
