// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and
//! operational logging in mergewood. Message types follow a struct-based
//! pattern with a `Display` implementation, so log text lives in one place and
//! every event carries the same structured fields.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - Evaluation run lifecycle and per-key outcomes
//! * `messages::recipe` - Recipe parsing and document validation
//! * `messages::registry` - Extension registration
//! * `messages::resolver` - Key alignment and fuzzy matching
//!
//! The library only emits events. Hosts install a subscriber, either their
//! own or the one [`init_tracing`] builds.
//!
//! # Usage
//!
//! ```rust
//! use mergewood::observability::messages::resolver::FuzzyKeyMatch;
//!
//! let msg = FuzzyKeyMatch {
//!     source_id: "tuned",
//!     canonical_key: "a.weight",
//!     source_key: "a.wieght",
//!     similarity: 0.75,
//! };
//!
//! tracing::debug!("{}", msg);
//! ```

use tracing_subscriber::EnvFilter;

use crate::errors::ConfigError;

pub mod messages;

/// Install a `fmt` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence when set; otherwise `level` is used as the
/// filter directive (`"info"`, `"mergewood=debug"`, ...). A subscriber that is
/// already installed is left in place.
pub fn init_tracing(level: &str) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| ConfigError::Invalid(format!("invalid log level '{level}': {e}")))?;

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
