//! Core data models for tabular result sets.
//!
//! A [`Dataset`] is the in-memory representation of one query result: a
//! label, an ordered set of canonical column names, and a sequence of
//! [`Record`]s whose cells are stored positionally against that column
//! order. The schema is declared once at construction, not inferred per
//! access; rows that do not match it are rejected up front.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Canonicalizes a column name to its case-insensitive comparison form.
///
/// Both datasets in a comparison canonicalize independently, so `"ID"`,
/// `" id "` and `"id"` all align to the same column.
pub fn canonical_column(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A single row of a [`Dataset`].
///
/// Cells are positional, aligned with the owning dataset's column order.
/// `None` is a backend NULL; `Some` carries the raw cell text exactly as
/// the query executor produced it. Normalization happens at comparison
/// time, never at storage time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    cells: Vec<Option<String>>,
}

impl Record {
    /// Creates a record from raw cells. Arity is checked by
    /// [`Dataset::push_row`], not here.
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Self { cells }
    }

    /// Raw cell at a column position, `None` if the position is out of
    /// range or the cell is NULL.
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|c| c.as_deref())
    }

    /// Number of cells in this record.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the record has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// An in-memory query result: label, ordered canonical columns, rows.
///
/// # Invariants
/// - Column names are stored in canonical (trimmed, lowercased) form and
///   keep the order the query produced them in.
/// - Every row has exactly one cell per column.
/// - Primary-key values *should* be unique; duplicates are detected during
///   comparison and reported as a warning, not a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    label: String,
    columns: Vec<String>,
    numeric_columns: BTreeSet<String>,
    rows: Vec<Record>,
}

impl Dataset {
    /// Creates an empty dataset with the given label and column set.
    ///
    /// Column names are canonicalized; duplicate canonical names (e.g.
    /// `"ID"` alongside `"id"`) keep the first occurrence's position and
    /// the rest are dropped. Executors feeding such a result set must
    /// collapse their rows to the deduplicated width, or every
    /// [`Dataset::push_row`] will fail the arity check against the
    /// declared columns.
    pub fn new(label: impl Into<String>, columns: Vec<String>) -> Self {
        let mut canonical = Vec::with_capacity(columns.len());
        for column in &columns {
            let name = canonical_column(column);
            if !canonical.contains(&name) {
                canonical.push(name);
            }
        }
        Self {
            label: label.into(),
            columns: canonical,
            numeric_columns: BTreeSet::new(),
            rows: Vec::new(),
        }
    }

    /// Declares which columns hold numeric data.
    ///
    /// A column classified numeric in *either* dataset of a comparison is
    /// canonicalized numerically on both sides.
    pub fn with_numeric_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.numeric_columns = columns
            .into_iter()
            .map(|c| canonical_column(c.as_ref()))
            .collect();
        self
    }

    /// Appends a row of raw cells.
    ///
    /// # Errors
    /// Returns a validation error if the cell count does not match the
    /// declared column count.
    pub fn push_row(&mut self, cells: Vec<Option<String>>) -> crate::Result<()> {
        if cells.len() != self.columns.len() {
            return Err(crate::error::ParityError::validation(format!(
                "row {} of dataset '{}' has {} cells, expected {} (columns: [{}])",
                self.rows.len(),
                self.label,
                cells.len(),
                self.columns.len(),
                self.columns.join(", ")
            )));
        }
        self.rows.push(Record::new(cells));
        Ok(())
    }

    /// Convenience for tests and loaders with no NULLs in play.
    ///
    /// # Errors
    /// Same arity check as [`Dataset::push_row`].
    pub fn push_values<I, S>(&mut self, cells: I) -> crate::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_row(cells.into_iter().map(|c| Some(c.into())).collect())
    }

    /// Dataset label ("source"/"target" by convention).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Ordered canonical column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Canonical names of columns declared numeric.
    pub fn numeric_columns(&self) -> &BTreeSet<String> {
        &self.numeric_columns
    }

    /// Position of a column by canonical name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let canonical = canonical_column(name);
        self.columns.iter().position(|c| *c == canonical)
    }

    /// All rows in insertion order.
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
