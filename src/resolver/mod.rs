// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Alignment of source keys against architecture schemas.
//!
//! Resolution runs in two passes. The exact pass claims every canonical key
//! present verbatim in the source. The fuzzy pass pairs the remaining
//! canonical and source keys by normalized Levenshtein similarity, greedily
//! from the most similar pair down, using each source key at most once.
//! Exact ties are marked ambiguous rather than guessed, whether one canonical
//! key ties between several source keys or several canonical keys tie on one
//! source key.

mod alignment;
mod similarity;

pub use alignment::{AlignmentSummary, KeyAlignment, KeyLookup, KeyMatch};
pub use similarity::{levenshtein, similarity};

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::config::consts::DEFAULT_SIMILARITY_THRESHOLD;
use crate::observability::messages::resolver::{AmbiguousKeyMatch, FuzzyKeyMatch};
use crate::observability::messages::StructuredLog;
use crate::registry::ArchitectureSchema;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyResolver {
    threshold: f64,
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

struct Candidate<'a> {
    canonical: &'a str,
    source: &'a str,
    similarity: f64,
}

impl KeyResolver {
    /// Resolver accepting fuzzy matches with similarity `>= threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Align `source_keys` to `architecture`, or keep them raw when there is none.
    pub fn align(
        &self,
        source_id: &str,
        source_keys: &BTreeSet<String>,
        architecture: Option<&Arc<ArchitectureSchema>>,
    ) -> KeyAlignment {
        let Some(architecture) = architecture else {
            return KeyAlignment::Raw {
                keys: source_keys.clone(),
            };
        };

        let mut matches = HashMap::with_capacity(architecture.keys.len());
        let mut used: HashSet<&str> = HashSet::new();

        for key in &architecture.keys {
            if source_keys.contains(key) {
                matches.insert(key.clone(), KeyMatch::Exact(key.clone()));
                used.insert(key.as_str());
            }
        }

        let unmatched: Vec<&str> = architecture
            .keys
            .iter()
            .map(String::as_str)
            .filter(|k| !matches.contains_key(*k))
            .collect();
        let free: Vec<&str> = source_keys
            .iter()
            .map(String::as_str)
            .filter(|k| !used.contains(k))
            .collect();

        let candidates = self.candidates(&unmatched, &free);
        self.assign(source_id, &candidates, &mut matches, &mut used);

        for key in unmatched {
            matches.entry(key.to_string()).or_insert(KeyMatch::Absent);
        }

        KeyAlignment::Schema {
            architecture: architecture.clone(),
            matches,
        }
    }

    /// All pairs reaching the threshold, most similar first, ties by key order.
    fn candidates<'a>(&self, canonical: &[&'a str], free: &[&'a str]) -> Vec<Candidate<'a>> {
        let free_lengths: Vec<usize> = free.iter().map(|k| k.chars().count()).collect();
        let mut candidates = Vec::new();
        for &c in canonical {
            let c_len = c.chars().count();
            for (&s, &s_len) in free.iter().zip(&free_lengths) {
                if similarity::similarity_upper_bound(c_len, s_len) < self.threshold {
                    continue;
                }
                let score = similarity(c, s);
                if score >= self.threshold {
                    candidates.push(Candidate {
                        canonical: c,
                        source: s,
                        similarity: score,
                    });
                }
            }
        }
        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.canonical.cmp(b.canonical))
                .then_with(|| a.source.cmp(b.source))
        });
        candidates
    }

    fn assign<'a>(
        &self,
        source_id: &str,
        candidates: &[Candidate<'a>],
        matches: &mut HashMap<String, KeyMatch>,
        used: &mut HashSet<&'a str>,
    ) {
        for (index, candidate) in candidates.iter().enumerate() {
            if matches.contains_key(candidate.canonical) || used.contains(candidate.source) {
                continue;
            }

            // Sorting groups every equally similar pair right after the
            // current one.
            let peers = candidates[index..]
                .iter()
                .take_while(|c| c.similarity == candidate.similarity);
            let tied: Vec<&str> = peers
                .clone()
                .filter(|c| c.canonical == candidate.canonical && !used.contains(c.source))
                .map(|c| c.source)
                .collect();
            let rivals: Vec<&str> = peers
                .filter(|c| {
                    c.source == candidate.source
                        && c.canonical != candidate.canonical
                        && !matches.contains_key(c.canonical)
                })
                .map(|c| c.canonical)
                .collect();

            if tied.len() > 1 || !rivals.is_empty() {
                // Every canonical key claiming this source key at this score
                // is ambiguous; the source key stays free.
                for canonical in std::iter::once(candidate.canonical).chain(rivals) {
                    let tied: Vec<&str> = candidates[index..]
                        .iter()
                        .take_while(|c| c.similarity == candidate.similarity)
                        .filter(|c| c.canonical == canonical && !used.contains(c.source))
                        .map(|c| c.source)
                        .collect();
                    Self::mark_ambiguous(source_id, canonical, &tied, candidate.similarity, matches);
                }
                continue;
            }

            FuzzyKeyMatch {
                source_id,
                canonical_key: candidate.canonical,
                source_key: candidate.source,
                similarity: candidate.similarity,
            }
            .log();
            used.insert(candidate.source);
            matches.insert(
                candidate.canonical.to_string(),
                KeyMatch::Fuzzy {
                    source_key: candidate.source.to_string(),
                    similarity: candidate.similarity,
                },
            );
        }
    }

    fn mark_ambiguous(
        source_id: &str,
        canonical: &str,
        tied: &[&str],
        similarity: f64,
        matches: &mut HashMap<String, KeyMatch>,
    ) {
        AmbiguousKeyMatch {
            source_id,
            canonical_key: canonical,
            candidates: tied,
            similarity,
        }
        .log();
        matches.insert(
            canonical.to_string(),
            KeyMatch::Ambiguous {
                candidates: tied.iter().map(|s| s.to_string()).collect(),
                similarity,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    fn schema(list: &[&str]) -> Arc<ArchitectureSchema> {
        Arc::new(ArchitectureSchema::new("test", list.iter().copied()))
    }

    #[test]
    fn test_exact_and_fuzzy_match() {
        let alignment = KeyResolver::new(0.7).align(
            "src",
            &keys(&["a.wieght", "b.weight"]),
            Some(&schema(&["a.weight", "b.weight"])),
        );
        assert_eq!(alignment.lookup("b.weight"), KeyLookup::Found("b.weight"));
        assert_eq!(alignment.lookup("a.weight"), KeyLookup::Found("a.wieght"));
        let summary = alignment.summary();
        assert_eq!((summary.exact, summary.fuzzy, summary.absent), (1, 1, 0));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let arch = schema(&["a.weight"]);
        let source = keys(&["a.wieght"]);
        assert_eq!(
            KeyResolver::new(0.75).align("s", &source, Some(&arch)).lookup("a.weight"),
            KeyLookup::Found("a.wieght")
        );
        assert_eq!(
            KeyResolver::new(0.76).align("s", &source, Some(&arch)).lookup("a.weight"),
            KeyLookup::Absent
        );
    }

    #[test]
    fn test_tied_candidates_are_ambiguous() {
        let alignment = KeyResolver::new(0.5).align(
            "src",
            &keys(&["layer.1x", "layer.1y"]),
            Some(&schema(&["layer.1"])),
        );
        match alignment.lookup("layer.1") {
            KeyLookup::Ambiguous { candidates, .. } => {
                assert_eq!(candidates, ["layer.1x".to_string(), "layer.1y".to_string()]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
        assert_eq!(alignment.summary().ambiguous, 1);
    }

    #[test]
    fn test_canonical_keys_tied_on_one_source_key_are_ambiguous() {
        // both canonical keys are one edit away from the single source key
        let alignment = KeyResolver::new(0.5).align(
            "src",
            &keys(&["w.b"]),
            Some(&schema(&["w.a", "w.c"])),
        );
        for key in ["w.a", "w.c"] {
            match alignment.lookup(key) {
                KeyLookup::Ambiguous { candidates, .. } => {
                    assert_eq!(candidates, ["w.b".to_string()]);
                }
                other => panic!("expected ambiguity for {key}, got {:?}", other),
            }
        }
        assert_eq!(alignment.summary().ambiguous, 2);
    }

    #[test]
    fn test_source_key_used_once() {
        // "w.abc" is closer to "w.ab" (0.8) than "w.a" is (0.75)
        let alignment = KeyResolver::new(0.5).align(
            "src",
            &keys(&["w.ab"]),
            Some(&schema(&["w.a", "w.abc"])),
        );
        assert_eq!(alignment.lookup("w.abc"), KeyLookup::Found("w.ab"));
        assert_eq!(alignment.lookup("w.a"), KeyLookup::Absent);
    }

    #[test]
    fn test_most_similar_pair_wins() {
        let alignment = KeyResolver::new(0.5).align(
            "src",
            &keys(&["model.blockz", "model.block_1x"]),
            Some(&schema(&["model.block_1", "model.block"])),
        );
        assert_eq!(alignment.lookup("model.block_1"), KeyLookup::Found("model.block_1x"));
        assert_eq!(alignment.lookup("model.block"), KeyLookup::Found("model.blockz"));
    }

    #[test]
    fn test_raw_mode_without_architecture() {
        let alignment = KeyResolver::default().align("src", &keys(&["z", "a"]), None);
        assert_eq!(alignment.output_keys(), vec!["a", "z"]);
        assert_eq!(alignment.lookup("a"), KeyLookup::Found("a"));
        assert_eq!(alignment.lookup("zz"), KeyLookup::Absent);
    }

    #[test]
    fn test_absent_counted_by_component() {
        let arch = Arc::new(
            ArchitectureSchema::new("c", ["enc.w", "enc.b", "dec.w"]).with_component("encoder", "enc."),
        );
        let alignment = KeyResolver::default().align("src", &keys(&["dec.w"]), Some(&arch));
        let summary = alignment.summary();
        assert_eq!(summary.absent, 2);
        assert_eq!(summary.absent_by_component.get("encoder"), Some(&2));
    }
}
