// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Minimum normalized similarity for a fuzzy key match (inclusive)
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
/// Finished-but-unwritten keys allowed per worker before dispatch pauses
pub const BUFFERED_KEYS_PER_WORKER: usize = 4;
/// Worker count when available parallelism cannot be determined
pub const FALLBACK_CONCURRENCY: usize = 4;
/// Deepest call nesting accepted in recipe text
pub const MAX_NESTING_DEPTH: usize = 256;
