// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message is a small struct borrowing the values it reports. `Display`
//! gives the human-readable line; [`StructuredLog`] emits it as a `tracing`
//! event with the same values attached as fields, at the level the message
//! type fixes.
//!
//! # Organization
//!
//! * `engine` - Evaluation run lifecycle and per-key outcomes
//! * `recipe` - Recipe parsing and document validation
//! * `registry` - Extension registration and freezing
//! * `resolver` - Key alignment and fuzzy matching
//!
//! # Usage Pattern
//!
//! ```rust
//! use mergewood::observability::messages::engine::EvaluationStarted;
//! use mergewood::observability::messages::StructuredLog;
//!
//! let msg = EvaluationStarted {
//!     strategy: "worker_pool",
//!     key_count: 1200,
//!     max_concurrency: 4,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod engine;
pub mod recipe;
pub mod registry;
pub mod resolver;

/// A message that knows its own level and fields.
pub trait StructuredLog {
    /// Emit the message as a `tracing` event.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
