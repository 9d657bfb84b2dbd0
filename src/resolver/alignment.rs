// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::registry::ArchitectureSchema;

/// How one canonical key maps onto a source.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyMatch {
    Exact(String),
    Fuzzy { source_key: String, similarity: f64 },
    /// Several free source keys tie for the best similarity; none is chosen.
    Ambiguous {
        candidates: Vec<String>,
        similarity: f64,
    },
    Absent,
}

/// Outcome of looking a canonical key up in an alignment.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyLookup<'a> {
    Found(&'a str),
    Absent,
    Ambiguous {
        candidates: &'a [String],
        similarity: f64,
    },
}

/// Per-leaf key mapping, built once per evaluation and read-only afterwards.
#[derive(Debug, Clone)]
pub enum KeyAlignment {
    /// No architecture declared; source keys are used verbatim.
    Raw { keys: BTreeSet<String> },
    Schema {
        architecture: Arc<ArchitectureSchema>,
        matches: HashMap<String, KeyMatch>,
    },
}

impl KeyAlignment {
    pub fn lookup(&self, key: &str) -> KeyLookup<'_> {
        match self {
            KeyAlignment::Raw { keys } => match keys.get(key) {
                Some(found) => KeyLookup::Found(found),
                None => KeyLookup::Absent,
            },
            KeyAlignment::Schema { matches, .. } => match matches.get(key) {
                Some(KeyMatch::Exact(found)) => KeyLookup::Found(found),
                Some(KeyMatch::Fuzzy { source_key, .. }) => KeyLookup::Found(source_key),
                Some(KeyMatch::Ambiguous {
                    candidates,
                    similarity,
                }) => KeyLookup::Ambiguous {
                    candidates,
                    similarity: *similarity,
                },
                Some(KeyMatch::Absent) | None => KeyLookup::Absent,
            },
        }
    }

    /// Keys this leaf contributes to the key universe, in output order.
    pub fn output_keys(&self) -> Vec<&str> {
        match self {
            KeyAlignment::Raw { keys } => keys.iter().map(String::as_str).collect(),
            KeyAlignment::Schema { architecture, .. } => {
                architecture.keys.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn summary(&self) -> AlignmentSummary {
        let mut summary = AlignmentSummary::default();
        match self {
            KeyAlignment::Raw { keys } => summary.exact = keys.len(),
            KeyAlignment::Schema {
                architecture,
                matches,
            } => {
                for key in &architecture.keys {
                    match matches.get(key) {
                        Some(KeyMatch::Exact(_)) => summary.exact += 1,
                        Some(KeyMatch::Fuzzy { .. }) => summary.fuzzy += 1,
                        Some(KeyMatch::Ambiguous { .. }) => summary.ambiguous += 1,
                        Some(KeyMatch::Absent) | None => {
                            summary.absent += 1;
                            let component = architecture
                                .component_of(key)
                                .unwrap_or("<none>")
                                .to_string();
                            *summary.absent_by_component.entry(component).or_insert(0) += 1;
                        }
                    }
                }
            }
        }
        summary
    }
}

/// Match counts for one alignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentSummary {
    pub exact: usize,
    pub fuzzy: usize,
    pub ambiguous: usize,
    pub absent: usize,
    pub absent_by_component: BTreeMap<String, usize>,
}
