//! Comparison request configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ParityError, Result};
use crate::models::{Dataset, canonical_column};

/// Row-count threshold above which delta detection proceeds in batches.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Everything one `compare` call needs: both datasets, the matching key,
/// and the tolerance rules.
///
/// Built with `with_*` methods; [`ComparisonRequest::validate`] runs
/// before any comparison work starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRequest {
    source: Dataset,
    target: Dataset,
    primary_key: String,
    omit_columns: BTreeSet<String>,
    omit_values: BTreeSet<String>,
    chunk_size: usize,
    label: String,
}

impl ComparisonRequest {
    /// Creates a request comparing `source` against `target`, matching
    /// records on `primary_key`.
    pub fn new(source: Dataset, target: Dataset, primary_key: impl AsRef<str>) -> Self {
        Self {
            source,
            target,
            primary_key: canonical_column(primary_key.as_ref()),
            omit_columns: BTreeSet::new(),
            omit_values: BTreeSet::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            label: "comparison".to_string(),
        }
    }

    /// Columns excluded from field-level comparison (case-insensitive).
    pub fn with_omit_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.omit_columns = columns
            .into_iter()
            .map(|c| canonical_column(c.as_ref()))
            .collect();
        self
    }

    /// Values treated as mutually equal regardless of literal text
    /// (case-insensitive), e.g. `{"N/A", "NULL"}`.
    pub fn with_omit_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.omit_values = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    /// Batch size for chunked processing. Chunking bounds peak memory,
    /// never changes the result.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Human-readable name attached to the result.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Checks request shape before any comparison work.
    ///
    /// # Errors
    /// - Configuration error for a zero chunk size.
    /// - Validation error for an empty dataset or a primary-key column
    ///   absent from one side (the message names the side and lists the
    ///   available columns).
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ParityError::configuration(
                "chunk_size must be greater than 0",
            ));
        }

        for dataset in [&self.source, &self.target] {
            if dataset.is_empty() {
                return Err(ParityError::validation(format!(
                    "dataset '{}' is empty",
                    dataset.label()
                )));
            }
        }

        Ok(())
    }

    /// Source dataset.
    pub fn source(&self) -> &Dataset {
        &self.source
    }

    /// Target dataset.
    pub fn target(&self) -> &Dataset {
        &self.target
    }

    /// Canonical primary-key column name.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Canonical omitted columns.
    pub fn omit_columns(&self) -> &BTreeSet<String> {
        &self.omit_columns
    }

    /// Lowercased treat-as-equal tokens.
    pub fn omit_values(&self) -> &BTreeSet<String> {
        &self.omit_values
    }

    /// Configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Comparison label.
    pub fn label(&self) -> &str {
        &self.label
    }
}
