//! Core comparison algorithm.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{ParityError, Result};
use crate::models::Dataset;
use crate::normalize::ValueNormalizer;
use crate::perf::PerformanceReport;

use super::request::ComparisonRequest;
use super::result::{ComparisonResult, ComparisonSummary, FieldDelta};

/// Compares two datasets record-by-record and field-by-field.
///
/// The engine is stateless between calls and never touches a backend;
/// both datasets arrive fully materialized in the request. All the
/// pieces of the answer (missing keys, per-field deltas, summary
/// metrics) come from one pass over the matched records, processed in
/// key-ordered chunks so results are identical for any chunk size.
#[derive(Debug, Clone, Default)]
pub struct ComparisonEngine {
    normalizer: ValueNormalizer,
}

impl ComparisonEngine {
    /// Creates an engine with the standard value normalizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one full comparison.
    ///
    /// # Errors
    /// - Configuration error for an invalid chunk size.
    /// - Validation error for an empty dataset or a primary-key column
    ///   absent from one side.
    /// - [`ParityError::NoCommonColumns`] when the two column sets are
    ///   disjoint; nothing is comparable and a silent empty result would
    ///   hide a wiring mistake.
    pub fn compare(&self, request: &ComparisonRequest) -> Result<ComparisonResult> {
        request.validate()?;

        let source = request.source();
        let target = request.target();
        let primary_key = request.primary_key();

        // Column alignment. Order follows the source dataset.
        let target_columns: BTreeSet<&str> =
            target.columns().iter().map(String::as_str).collect();
        let common_columns: Vec<String> = source
            .columns()
            .iter()
            .filter(|c| target_columns.contains(c.as_str()))
            .cloned()
            .collect();
        if common_columns.is_empty() {
            return Err(ParityError::NoCommonColumns {
                source_columns: source.columns().to_vec(),
                target_columns: target.columns().to_vec(),
            });
        }

        let source_key_index = source.column_index(primary_key).ok_or_else(|| {
            missing_key_error(source, primary_key)
        })?;
        let target_key_index = target.column_index(primary_key).ok_or_else(|| {
            missing_key_error(target, primary_key)
        })?;

        // A column numeric on either side is canonicalized numerically on
        // both.
        let numeric_columns: BTreeSet<String> = source
            .numeric_columns()
            .union(target.numeric_columns())
            .cloned()
            .collect();
        let key_is_numeric = numeric_columns.contains(primary_key);

        let (source_keys, source_duplicate_keys) =
            self.index_by_key(source, source_key_index, key_is_numeric);
        let (target_keys, target_duplicate_keys) =
            self.index_by_key(target, target_key_index, key_is_numeric);

        // Key partitioning. Every key lands in exactly one of the three
        // sets.
        let mut missing_in_target: Vec<String> = source_keys
            .keys()
            .filter(|k| !target_keys.contains_key(*k))
            .cloned()
            .collect();
        missing_in_target.sort();
        let mut missing_in_source: Vec<String> = target_keys
            .keys()
            .filter(|k| !source_keys.contains_key(*k))
            .cloned()
            .collect();
        missing_in_source.sort();
        let mut common_keys: Vec<String> = source_keys
            .keys()
            .filter(|k| target_keys.contains_key(*k))
            .cloned()
            .collect();
        common_keys.sort();

        let columns_compared: Vec<String> = common_columns
            .iter()
            .filter(|c| c.as_str() != primary_key && !request.omit_columns().contains(*c))
            .cloned()
            .collect();
        let compared_indices: Vec<(String, usize, usize, bool)> = columns_compared
            .iter()
            .filter_map(|column| {
                let si = source.column_index(column)?;
                let ti = target.column_index(column)?;
                Some((column.clone(), si, ti, numeric_columns.contains(column)))
            })
            .collect();

        let mut field_deltas: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut detailed_deltas: Vec<FieldDelta> = Vec::new();

        let chunk_size = request.chunk_size();
        let chunk_count = common_keys.len().div_ceil(chunk_size.max(1));
        for (chunk_number, chunk) in common_keys.chunks(chunk_size).enumerate() {
            debug!(
                "Comparing chunk {}/{} ({} keys)",
                chunk_number + 1,
                chunk_count,
                chunk.len()
            );
            for key in chunk {
                let source_row = &source.rows()[source_keys[key]];
                let target_row = &target.rows()[target_keys[key]];

                for (column, si, ti, numeric) in &compared_indices {
                    let source_value = self.normalizer.normalize(source_row.cell(*si), *numeric);
                    let target_value = self.normalizer.normalize(target_row.cell(*ti), *numeric);

                    if source_value == target_value {
                        continue;
                    }
                    if request.omit_values().contains(&source_value.to_lowercase())
                        && request.omit_values().contains(&target_value.to_lowercase())
                    {
                        continue;
                    }

                    field_deltas
                        .entry(column.clone())
                        .or_default()
                        .push(key.clone());
                    detailed_deltas.push(FieldDelta {
                        key: key.clone(),
                        field: column.clone(),
                        source_value,
                        target_value,
                    });
                }
            }
        }

        let total_field_differences = detailed_deltas.len();
        let fields_with_deltas = field_deltas.len();
        let fields_without_deltas = columns_compared.len() - fields_with_deltas;
        let field_match_percentage = if columns_compared.is_empty() {
            100.0
        } else {
            fields_without_deltas as f64 / columns_compared.len() as f64 * 100.0
        };
        let larger_side = source.len().max(target.len());
        let record_match_percentage = if larger_side == 0 {
            100.0
        } else {
            common_keys.len() as f64 / larger_side as f64 * 100.0
        };
        let perfect_match = total_field_differences == 0
            && missing_in_target.is_empty()
            && missing_in_source.is_empty();

        let summary = ComparisonSummary {
            source_rows: source.len(),
            target_rows: target.len(),
            common_records: common_keys.len(),
            total_field_differences,
            fields_with_deltas,
            fields_without_deltas,
            field_match_percentage,
            record_match_percentage,
            perfect_match,
        };

        info!(
            "Comparison '{}': {} common records, {} missing in target, {} missing in source, {} field differences",
            request.label(),
            summary.common_records,
            missing_in_target.len(),
            missing_in_source.len(),
            total_field_differences
        );

        let source_only_columns = source
            .columns()
            .iter()
            .filter(|c| !target_columns.contains(c.as_str()))
            .cloned()
            .collect();
        let source_column_set: BTreeSet<&str> =
            source.columns().iter().map(String::as_str).collect();
        let target_only_columns = target
            .columns()
            .iter()
            .filter(|c| !source_column_set.contains(c.as_str()))
            .cloned()
            .collect();

        Ok(ComparisonResult {
            label: request.label().to_string(),
            generated_at: Utc::now(),
            missing_in_target,
            missing_in_source,
            field_deltas,
            detailed_deltas,
            common_columns,
            columns_compared,
            source_only_columns,
            target_only_columns,
            source_duplicate_keys,
            target_duplicate_keys,
            summary,
            performance: PerformanceReport::default(),
        })
    }

    /// Maps each normalized key to the row index of its first occurrence.
    ///
    /// Returns the map plus the number of rows dropped because their key
    /// repeated an earlier one.
    fn index_by_key(
        &self,
        dataset: &Dataset,
        key_index: usize,
        numeric: bool,
    ) -> (HashMap<String, usize>, usize) {
        let mut keys: HashMap<String, usize> = HashMap::with_capacity(dataset.len());
        let mut duplicates = 0usize;
        for (row_index, row) in dataset.rows().iter().enumerate() {
            let key = self.normalizer.normalize(row.cell(key_index), numeric);
            if keys.contains_key(&key) {
                duplicates += 1;
            } else {
                keys.insert(key, row_index);
            }
        }
        if duplicates > 0 {
            warn!(
                "Dataset '{}' has {} duplicate primary-key value(s); keeping first occurrences",
                dataset.label(),
                duplicates
            );
        }
        (keys, duplicates)
    }
}

fn missing_key_error(dataset: &Dataset, primary_key: &str) -> ParityError {
    ParityError::validation(format!(
        "primary-key column '{}' not found in dataset '{}' (columns: [{}])",
        primary_key,
        dataset.label(),
        dataset.columns().join(", ")
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn dataset(label: &str, columns: &[&str], rows: &[&[&str]]) -> Dataset {
        let mut ds = Dataset::new(label, columns.iter().map(|c| (*c).to_string()).collect());
        for row in rows {
            ds.push_values(row.iter().copied()).unwrap();
        }
        ds
    }

    fn compare(request: &ComparisonRequest) -> ComparisonResult {
        ComparisonEngine::new().compare(request).unwrap()
    }

    #[test]
    fn test_identical_datasets_perfect_match() {
        let columns = ["id", "name", "city"];
        let rows: &[&[&str]] = &[&["1", "Alice", "Oslo"], &["2", "Bob", "Bergen"]];
        let request = ComparisonRequest::new(
            dataset("source", &columns, rows),
            dataset("target", &columns, rows),
            "id",
        );

        let result = compare(&request);
        assert!(result.is_perfect_match());
        assert!(result.missing_in_target.is_empty());
        assert!(result.missing_in_source.is_empty());
        assert!(result.field_deltas.is_empty());
        assert_eq!(result.summary.common_records, 2);
        assert_eq!(result.summary.field_match_percentage, 100.0);
        assert_eq!(result.summary.record_match_percentage, 100.0);
    }

    #[test]
    fn test_missing_record_detected() {
        let columns = ["id", "name"];
        let request = ComparisonRequest::new(
            dataset("source", &columns, &[&["1", "Alice"], &["2", "Bob"]]),
            dataset("target", &columns, &[&["1", "Alice"]]),
            "id",
        );

        let result = compare(&request);
        assert_eq!(result.missing_in_target, ["2"]);
        assert!(result.missing_in_source.is_empty());
        assert!(result.field_deltas.is_empty());
        assert!(!result.is_perfect_match());
        assert_eq!(result.summary.common_records, 1);
        assert_eq!(result.summary.record_match_percentage, 50.0);
    }

    #[test]
    fn test_field_delta_carries_normalized_values() {
        let columns = ["id", "city"];
        let request = ComparisonRequest::new(
            dataset("source", &columns, &[&["1", "Oslo"], &["2", "  Bergen  "]]),
            dataset("target", &columns, &[&["1", "Oslo"], &["2", "Trondheim"]]),
            "id",
        );

        let result = compare(&request);
        assert_eq!(result.field_deltas["city"], ["2"]);
        assert_eq!(
            result.detailed_deltas,
            [FieldDelta {
                key: "2".into(),
                field: "city".into(),
                source_value: "Bergen".into(),
                target_value: "Trondheim".into(),
            }]
        );
        assert_eq!(result.summary.total_field_differences, 1);
        assert_eq!(result.summary.fields_with_deltas, 1);
    }

    #[test]
    fn test_numeric_representations_compare_equal() {
        let columns = ["id", "amount"];
        let source = dataset("source", &columns, &[&["1", "1234"], &["2", "0.5"]])
            .with_numeric_columns(["amount"]);
        let target = dataset("target", &columns, &[&["1", "1234.0"], &["2", "0.5000"]]);
        let request = ComparisonRequest::new(source, target, "id");

        let result = compare(&request);
        assert!(result.is_perfect_match(), "deltas: {:?}", result.detailed_deltas);
    }

    #[test]
    fn test_numeric_key_alignment_across_renderings() {
        let columns = ["id", "name"];
        let source = dataset("source", &columns, &[&["1.0", "Alice"]])
            .with_numeric_columns(["id"]);
        let target = dataset("target", &columns, &[&["1", "Alice"]]);
        let request = ComparisonRequest::new(source, target, "id");

        let result = compare(&request);
        assert!(result.missing_in_target.is_empty());
        assert_eq!(result.summary.common_records, 1);
    }

    #[test]
    fn test_no_common_columns_is_an_error() {
        let request = ComparisonRequest::new(
            dataset("source", &["a", "b"], &[&["1", "2"]]),
            dataset("target", &["c", "d"], &[&["1", "2"]]),
            "a",
        );

        let err = ComparisonEngine::new().compare(&request).unwrap_err();
        match err {
            ParityError::NoCommonColumns {
                source_columns,
                target_columns,
            } => {
                assert_eq!(source_columns, ["a", "b"]);
                assert_eq!(target_columns, ["c", "d"]);
            }
            other => panic!("expected NoCommonColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_primary_key_names_the_side() {
        let request = ComparisonRequest::new(
            dataset("source", &["id", "name"], &[&["1", "Alice"]]),
            dataset("target", &["name", "city"], &[&["Alice", "Oslo"]]),
            "id",
        );

        let err = ComparisonEngine::new().compare(&request).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'id'"));
        assert!(message.contains("'target'"));
        assert!(message.contains("name, city"));
    }

    #[test]
    fn test_duplicate_keys_first_occurrence_wins() {
        let columns = ["id", "name"];
        let source = dataset(
            "source",
            &columns,
            &[&["1", "first"], &["1", "second"], &["2", "Bob"]],
        );
        let target = dataset("target", &columns, &[&["1", "first"], &["2", "Bob"]]);
        let request = ComparisonRequest::new(source, target, "id");

        let result = compare(&request);
        assert_eq!(result.source_duplicate_keys, 1);
        assert_eq!(result.target_duplicate_keys, 0);
        // Row "second" was dropped, so key 1 matches cleanly
        assert!(result.field_deltas.is_empty());
    }

    #[test]
    fn test_chunk_size_does_not_change_the_result() {
        let columns = ["id", "name", "city"];
        let mut source_rows: Vec<Vec<String>> = Vec::new();
        let mut target_rows: Vec<Vec<String>> = Vec::new();
        for i in 0..50 {
            source_rows.push(vec![i.to_string(), format!("name{i}"), "Oslo".into()]);
            let city = if i % 7 == 0 { "Bergen" } else { "Oslo" };
            target_rows.push(vec![i.to_string(), format!("name{i}"), city.into()]);
        }
        let build = |label: &str, rows: &[Vec<String>]| {
            let mut ds =
                Dataset::new(label, columns.iter().map(|c| (*c).to_string()).collect());
            for row in rows {
                ds.push_values(row.iter().cloned()).unwrap();
            }
            ds
        };

        let baseline = compare(
            &ComparisonRequest::new(
                build("source", &source_rows),
                build("target", &target_rows),
                "id",
            )
            .with_chunk_size(1000),
        );
        for chunk_size in [1, 3, 50] {
            let result = compare(
                &ComparisonRequest::new(
                    build("source", &source_rows),
                    build("target", &target_rows),
                    "id",
                )
                .with_chunk_size(chunk_size),
            );
            assert_eq!(result.field_deltas, baseline.field_deltas);
            assert_eq!(result.detailed_deltas, baseline.detailed_deltas);
            assert_eq!(result.summary, baseline.summary);
        }
    }

    #[test]
    fn test_omitted_columns_are_not_compared() {
        let columns = ["id", "name", "updated_at"];
        let request = ComparisonRequest::new(
            dataset("source", &columns, &[&["1", "Alice", "2024-01-01"]]),
            dataset("target", &columns, &[&["1", "Alice", "2024-06-30"]]),
            "id",
        )
        .with_omit_columns(["Updated_At"]);

        let result = compare(&request);
        assert!(result.is_perfect_match());
        assert_eq!(result.columns_compared, ["name"]);
        assert_eq!(result.common_columns, ["id", "name", "updated_at"]);
    }

    #[test]
    fn test_omit_values_equal_only_when_both_sides_listed() {
        let columns = ["id", "status"];
        let request = ComparisonRequest::new(
            dataset(
                "source",
                &columns,
                &[&["1", "N/A"], &["2", "N/A"], &["3", "active"]],
            ),
            dataset(
                "target",
                &columns,
                &[&["1", "NULL"], &["2", "active"], &["3", "active"]],
            ),
            "id",
        )
        .with_omit_values(["N/A", "NULL"]);

        let result = compare(&request);
        // Key 1: both sides in the omit set. Key 2: only one side is.
        assert_eq!(result.field_deltas["status"], ["2"]);
        assert_eq!(result.summary.total_field_differences, 1);
    }

    #[test]
    fn test_null_and_null_words_compare_equal() {
        let columns = ["id", "note"];
        let mut source = Dataset::new(
            "source",
            columns.iter().map(|c| (*c).to_string()).collect(),
        );
        source.push_row(vec![Some("1".into()), None]).unwrap();
        let target = dataset("target", &columns, &[&["1", "None"]]);
        let request = ComparisonRequest::new(source, target, "id");

        let result = compare(&request);
        assert!(result.is_perfect_match());
    }

    #[test]
    fn test_deltas_ordered_by_ascending_key() {
        let columns = ["id", "name"];
        let request = ComparisonRequest::new(
            dataset(
                "source",
                &columns,
                &[&["9", "x"], &["10", "x"], &["2", "x"]],
            ),
            dataset(
                "target",
                &columns,
                &[&["9", "y"], &["10", "y"], &["2", "y"]],
            ),
            "id",
        );

        let result = compare(&request);
        // Keys are normalized strings, so ordering is lexicographic
        assert_eq!(result.field_deltas["name"], ["10", "2", "9"]);
        let delta_keys: Vec<_> = result.detailed_deltas.iter().map(|d| d.key.clone()).collect();
        assert_eq!(delta_keys, ["10", "2", "9"]);
    }

    #[test]
    fn test_partition_covers_every_key_once() {
        let columns = ["id", "name"];
        let request = ComparisonRequest::new(
            dataset("source", &columns, &[&["1", "a"], &["2", "b"], &["3", "c"]]),
            dataset("target", &columns, &[&["2", "b"], &["3", "x"], &["4", "d"]]),
            "id",
        );

        let result = compare(&request);
        assert_eq!(result.missing_in_target, ["1"]);
        assert_eq!(result.missing_in_source, ["4"]);
        assert_eq!(result.summary.common_records, 2);
        assert_eq!(
            result.missing_in_target.len()
                + result.missing_in_source.len()
                + result.summary.common_records * 2,
            result.summary.source_rows + result.summary.target_rows
        );
    }

    #[test]
    fn test_partially_overlapping_columns() {
        let request = ComparisonRequest::new(
            dataset("source", &["id", "name", "extra_s"], &[&["1", "a", "s"]]),
            dataset("target", &["id", "name", "extra_t"], &[&["1", "a", "t"]]),
            "id",
        );

        let result = compare(&request);
        assert_eq!(result.common_columns, ["id", "name"]);
        assert_eq!(result.source_only_columns, ["extra_s"]);
        assert_eq!(result.target_only_columns, ["extra_t"]);
        assert!(result.is_perfect_match());
    }

    #[test]
    fn test_summary_percentages() {
        let columns = ["id", "a", "b"];
        let request = ComparisonRequest::new(
            dataset(
                "source",
                &columns,
                &[&["1", "x", "p"], &["2", "x", "q"], &["3", "x", "r"], &["4", "x", "s"]],
            ),
            dataset(
                "target",
                &columns,
                &[&["1", "x", "p"], &["2", "x", "DIFF"], &["3", "x", "r"]],
            ),
            "id",
        );

        let result = compare(&request);
        // 2 compared columns, 1 has a delta
        assert_eq!(result.summary.fields_with_deltas, 1);
        assert_eq!(result.summary.fields_without_deltas, 1);
        assert_eq!(result.summary.field_match_percentage, 50.0);
        // 3 common of max(4, 3) rows
        assert_eq!(result.summary.record_match_percentage, 75.0);
        assert!(!result.summary.perfect_match);
    }

    #[test]
    fn test_compare_is_idempotent() {
        let columns = ["id", "name"];
        let request = ComparisonRequest::new(
            dataset("source", &columns, &[&["1", "a"], &["2", "b"]]),
            dataset("target", &columns, &[&["1", "a"], &["2", "x"]]),
            "id",
        );

        let first = compare(&request);
        let second = compare(&request);
        assert_eq!(first.field_deltas, second.field_deltas);
        assert_eq!(first.detailed_deltas, second.detailed_deltas);
        assert_eq!(first.summary, second.summary);
    }
}
