// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for key resolution.

use crate::observability::messages::StructuredLog;
use crate::resolver::AlignmentSummary;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Several source keys tie for the best match of one canonical key.
///
/// # Log Level
/// `warn!` - The key will fail during evaluation
///
/// # Example
/// ```
/// use mergewood::observability::messages::resolver::AmbiguousKeyMatch;
///
/// let msg = AmbiguousKeyMatch {
///     source_id: "tuned",
///     canonical_key: "decoder.weight",
///     candidates: &["decoder.weight.0", "decoder.weight.1"],
///     similarity: 0.875,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct AmbiguousKeyMatch<'a> {
    pub source_id: &'a str,
    pub canonical_key: &'a str,
    pub candidates: &'a [&'a str],
    pub similarity: f64,
}

impl Display for AmbiguousKeyMatch<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Source '{}': key '{}' matches {} keys equally well ({:.3}): {}",
            self.source_id,
            self.canonical_key,
            self.candidates.len(),
            self.similarity,
            self.candidates.join(", ")
        )
    }
}

impl StructuredLog for AmbiguousKeyMatch<'_> {
    fn log(&self) {
        tracing::warn!(
            source_id = self.source_id,
            canonical_key = self.canonical_key,
            candidates = %self.candidates.join(", "),
            candidate_count = self.candidates.len(),
            similarity = self.similarity,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "ambiguous_key_match",
            span_name = name,
            source_id = self.source_id,
            canonical_key = self.canonical_key,
            candidate_count = self.candidates.len(),
        )
    }
}

/// A canonical key was bound to a differently named source key.
///
/// # Log Level
/// `debug!` - One per renamed key
pub struct FuzzyKeyMatch<'a> {
    pub source_id: &'a str,
    pub canonical_key: &'a str,
    pub source_key: &'a str,
    pub similarity: f64,
}

impl Display for FuzzyKeyMatch<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Source '{}': '{}' resolved to '{}' ({:.3})",
            self.source_id, self.canonical_key, self.source_key, self.similarity
        )
    }
}

impl StructuredLog for FuzzyKeyMatch<'_> {
    fn log(&self) {
        tracing::debug!(
            source_id = self.source_id,
            canonical_key = self.canonical_key,
            source_key = self.source_key,
            similarity = self.similarity,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "fuzzy_key_match",
            span_name = name,
            source_id = self.source_id,
            canonical_key = self.canonical_key,
            source_key = self.source_key,
        )
    }
}

/// Alignment of one source against its architecture's key list.
///
/// # Log Level
/// `info!` - One per source per run
pub struct AlignmentComputed<'a> {
    pub source_id: &'a str,
    pub architecture: &'a str,
    pub summary: &'a AlignmentSummary,
}

impl Display for AlignmentComputed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Aligned source '{}' to '{}': {} exact, {} fuzzy, {} ambiguous, {} absent",
            self.source_id,
            self.architecture,
            self.summary.exact,
            self.summary.fuzzy,
            self.summary.ambiguous,
            self.summary.absent
        )
    }
}

impl StructuredLog for AlignmentComputed<'_> {
    fn log(&self) {
        tracing::info!(
            source_id = self.source_id,
            architecture = self.architecture,
            exact = self.summary.exact,
            fuzzy = self.summary.fuzzy,
            ambiguous = self.summary.ambiguous,
            absent = self.summary.absent,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "alignment",
            span_name = name,
            source_id = self.source_id,
            architecture = self.architecture,
        )
    }
}

/// A source lacks keys belonging to one architecture component.
pub struct ComponentKeysMissing<'a> {
    pub source_id: &'a str,
    pub component: &'a str,
    pub missing: usize,
}

impl Display for ComponentKeysMissing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Source '{}' is missing {} keys of component '{}'",
            self.source_id, self.missing, self.component
        )
    }
}

impl StructuredLog for ComponentKeysMissing<'_> {
    fn log(&self) {
        tracing::warn!(
            source_id = self.source_id,
            component = self.component,
            missing = self.missing,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "component_keys_missing",
            span_name = name,
            source_id = self.source_id,
            component = self.component,
            missing = self.missing,
        )
    }
}
