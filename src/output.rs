//! Result types returned to callers.
//!
//! A single conversion returns `Result<PathBuf, ConvertError>`; a batch
//! flattens every per-item result into a [`ConversionOutcome`] so the whole
//! [`BatchResult`] is `Clone + Serialize` and can be logged or shipped to a
//! UI thread as-is.

use crate::error::{ConvertError, ErrorKind, ItemFailure};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of one conversion.
pub type ConversionResult = Result<PathBuf, ConvertError>;

/// Tagged outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionOutcome {
    Success { output_path: PathBuf },
    Failure(ItemFailure),
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        match self {
            ConversionOutcome::Success { output_path } => Some(output_path),
            ConversionOutcome::Failure(_) => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ConversionOutcome::Success { .. } => None,
            ConversionOutcome::Failure(f) => Some(f.kind),
        }
    }
}

impl From<ConversionResult> for ConversionOutcome {
    fn from(r: ConversionResult) -> Self {
        match r {
            Ok(output_path) => ConversionOutcome::Success { output_path },
            Err(e) => ConversionOutcome::Failure(ItemFailure::from(e)),
        }
    }
}

/// One input and what became of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub input_path: PathBuf,
    pub outcome: ConversionOutcome,
}

/// Aggregate counters for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

/// Every input's outcome, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub entries: Vec<BatchEntry>,
    pub stats: BatchStats,
}

impl BatchResult {
    pub(crate) fn from_entries(entries: Vec<BatchEntry>, duration_ms: u64) -> Self {
        let succeeded = entries.iter().filter(|e| e.outcome.is_success()).count();
        let stats = BatchStats {
            total: entries.len(),
            succeeded,
            failed: entries.len() - succeeded,
            duration_ms,
        };
        Self { entries, stats }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Output paths of the successful items, in input order.
    pub fn successes(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.iter().filter_map(|e| e.outcome.output_path())
    }

    /// Failed items, in input order.
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &ItemFailure)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            ConversionOutcome::Failure(f) => Some((&e.input_path, f)),
            ConversionOutcome::Success { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_outcomes() {
        let entries = vec![
            BatchEntry {
                input_path: "a.png".into(),
                outcome: Ok(PathBuf::from("out/a.jpg")).into(),
            },
            BatchEntry {
                input_path: "b.png".into(),
                outcome: Err(ConvertError::UnsupportedFormat("nope".into())).into(),
            },
        ];
        let result = BatchResult::from_entries(entries, 12);
        assert_eq!(result.stats.total, 2);
        assert_eq!(result.stats.succeeded, 1);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.successes().count(), 1);
        let (path, failure) = result.failures().next().unwrap();
        assert_eq!(path, &PathBuf::from("b.png"));
        assert_eq!(failure.kind, ErrorKind::UnsupportedFormat);
    }
}
