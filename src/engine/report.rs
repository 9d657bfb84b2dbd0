// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;

use crate::engine::plan::AlignmentReport;
use crate::errors::KeyError;
use crate::traits::RunStatus;

/// A key that could not be produced, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyFailure {
    pub key: String,
    pub kind: &'static str,
    pub message: String,
}

impl From<&KeyError> for KeyFailure {
    fn from(error: &KeyError) -> Self {
        Self {
            key: error.key().to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Summary of a finished evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub strategy: &'static str,
    pub status: RunStatus,
    pub total_keys: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<KeyFailure>,
    /// Most finished keys ever held back waiting on a lower key.
    pub peak_buffered_keys: usize,
    pub duration_ms: u64,
    pub alignments: Vec<AlignmentReport>,
}

impl MergeReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failure(&self, key: &str) -> Option<&KeyFailure> {
        self.failed.iter().find(|f| f.key == key)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> MergeReport {
        MergeReport {
            strategy: "sequential",
            status: RunStatus::Complete,
            total_keys: 3,
            attempted: 3,
            succeeded: 1,
            skipped: 1,
            failed: vec![KeyFailure::from(&KeyError::MissingKey {
                key: "b".to_string(),
                origin: "source 'x'".to_string(),
            })],
            peak_buffered_keys: 0,
            duration_ms: 12,
            alignments: Vec::new(),
        }
    }

    #[test]
    fn test_failure_lookup() {
        let report = report();
        assert!(report.has_failures());
        let failure = report.failure("b").unwrap();
        assert_eq!(failure.kind, "missing_key");
        assert!(report.failure("a").is_none());
    }

    #[test]
    fn test_report_serializes_to_json() {
        let json = report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["strategy"], "sequential");
        assert_eq!(value["status"]["status"], "complete");
        assert_eq!(value["failed"][0]["key"], "b");
        assert_eq!(value["failed"][0]["kind"], "missing_key");
    }
}
