//! Comparison outcome model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::perf::PerformanceReport;

/// One field-level difference between two records matched by key.
///
/// Values are the normalized forms that were actually compared, so a
/// reader can see exactly why the field was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDelta {
    /// Normalized primary-key value of the differing record.
    pub key: String,
    /// Canonical name of the differing column.
    pub field: String,
    /// Normalized source-side value.
    pub source_value: String,
    /// Normalized target-side value.
    pub target_value: String,
}

/// Aggregate match metrics for one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Row count of the source dataset as fetched.
    pub source_rows: usize,
    /// Row count of the target dataset as fetched.
    pub target_rows: usize,
    /// Records whose key appears on both sides.
    pub common_records: usize,
    /// Total field-level differences across all common records.
    pub total_field_differences: usize,
    /// Compared columns with at least one delta.
    pub fields_with_deltas: usize,
    /// Compared columns with no delta at all.
    pub fields_without_deltas: usize,
    /// Delta-free compared columns as a percentage of all compared columns.
    pub field_match_percentage: f64,
    /// Common records as a percentage of the larger side's row count.
    pub record_match_percentage: f64,
    /// True when both missing sets are empty and no field differs.
    pub perfect_match: bool,
}

/// Full outcome of one comparison run.
///
/// All collections are deterministically ordered: missing keys and
/// delta lists ascend by normalized key, field maps by column name. Two
/// runs over the same inputs produce identical results regardless of
/// chunk size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Label the request was tagged with.
    pub label: String,
    /// When the comparison finished.
    pub generated_at: DateTime<Utc>,
    /// Keys present in the source but absent from the target, ascending.
    pub missing_in_target: Vec<String>,
    /// Keys present in the target but absent from the source, ascending.
    pub missing_in_source: Vec<String>,
    /// Differing column name to the ascending keys it differs for.
    /// Columns with no differences carry no entry.
    pub field_deltas: BTreeMap<String, Vec<String>>,
    /// Every field-level difference with both normalized values,
    /// ascending by key and then by column position.
    pub detailed_deltas: Vec<FieldDelta>,
    /// Columns present on both sides, in source column order.
    pub common_columns: Vec<String>,
    /// Common columns actually value-compared (key and omitted columns
    /// excluded), in source column order.
    pub columns_compared: Vec<String>,
    /// Columns only the source carries.
    pub source_only_columns: Vec<String>,
    /// Columns only the target carries.
    pub target_only_columns: Vec<String>,
    /// Source rows dropped because their key repeated an earlier row.
    pub source_duplicate_keys: usize,
    /// Target rows dropped because their key repeated an earlier row.
    pub target_duplicate_keys: usize,
    /// Aggregate metrics.
    pub summary: ComparisonSummary,
    /// Timings recorded by the session that ran this comparison. Empty
    /// when the engine was driven directly.
    pub performance: PerformanceReport,
}

impl ComparisonResult {
    /// Whether every record matched on every compared field.
    pub fn is_perfect_match(&self) -> bool {
        self.summary.perfect_match
    }

    /// Attaches session timings to the result.
    #[must_use]
    pub fn with_performance(mut self, performance: PerformanceReport) -> Self {
        self.performance = performance;
        self
    }
}
