//! Defines `RowSet`, the in-memory table that flows from the flattener to the sink.

use crate::types::cell_value::CellValue;
use crate::types::flat_row::FlatRow;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowSetError {
    #[error("None of the requested columns are present in the row-set")]
    EmptySelection,

    #[error("Row-set is missing key columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("No key columns were given")]
    NoKeyColumns,
}

/// An ordered collection of [`FlatRow`]s sharing one column list.
///
/// The column list is the union of every row's columns in first-seen order.
/// Rows do not have to carry every column; a missing cell reads as `Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<FlatRow>,
}

impl RowSet {
    /// An empty row-set with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects `rows` in order, growing the column list as new columns appear.
    pub fn from_rows(rows: impl IntoIterator<Item = FlatRow>) -> Self {
        let mut set = Self::new();
        for row in rows {
            set.push(row);
        }
        set
    }

    /// Cross product of a single `base` row with every row of `others`.
    ///
    /// Each output row starts with the base columns; colliding columns from the
    /// other side get `suffix` appended (see [`FlatRow::merged_with`]).
    pub fn cross_join(
        base: &FlatRow,
        others: impl IntoIterator<Item = FlatRow>,
        suffix: &str,
    ) -> Self {
        Self::from_rows(others.into_iter().map(|row| base.merged_with(&row, suffix)))
    }

    /// Appends `row`.
    ///
    /// # Arguments
    ///
    /// * `row` - The row to append. Columns it introduces are added to the end of the
    ///   column list; columns it lacks read as `Null` for this row.
    ///
    /// ```
    /// use weather_ingest::{FlatRow, RowSet};
    ///
    /// let mut set = RowSet::new();
    /// set.push([("location", "Columbus")].into_iter().collect::<FlatRow>());
    /// set.push([("temp", 47.2)].into_iter().collect::<FlatRow>());
    /// assert_eq!(set.columns(), ["location", "temp"]);
    /// ```
    pub fn push(&mut self, row: FlatRow) {
        for column in row.columns() {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.to_string());
            }
        }
        self.rows.push(row);
    }

    /// The union of all row columns, in first-seen order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether any row carries `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The rows in insertion order.
    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    /// Mutable access to the rows.
    ///
    /// Meant for editing existing cells. A column inserted this way is not added to
    /// [`RowSet::columns`]; use [`RowSet::set_column`] for that.
    pub fn rows_mut(&mut self) -> &mut [FlatRow] {
        &mut self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows, whatever the column list says.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (`row`, `column`); `None` when the row is out of range or lacks the column.
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// All values of one column, `Null` where a row lacks it.
    pub fn column_values(&self, column: &str) -> Vec<CellValue> {
        self.rows
            .iter()
            .map(|row| row.get(column).cloned().unwrap_or(CellValue::Null))
            .collect()
    }

    /// Projects onto the columns of `allowed` that are present, in `allowed`'s order.
    ///
    /// Columns outside `allowed` are dropped. An empty intersection is an error
    /// because nothing meaningful could be persisted from it.
    pub fn select(&self, allowed: &[&str]) -> Result<RowSet, RowSetError> {
        let kept: Vec<&str> = allowed
            .iter()
            .copied()
            .filter(|column| self.has_column(column))
            .collect();
        if kept.is_empty() {
            return Err(RowSetError::EmptySelection);
        }

        let rows = self.rows.iter().map(|row| {
            kept.iter()
                .filter_map(|column| row.get(column).map(|v| (*column, v.clone())))
                .collect::<FlatRow>()
        });
        let mut projected = RowSet::from_rows(rows);
        // Keep the allow-list order even if the first row lacked some columns.
        projected.columns = kept.iter().map(|c| c.to_string()).collect();
        Ok(projected)
    }

    /// Sets `column` to `value` on every row.
    pub fn set_column(&mut self, column: &str, value: CellValue) {
        for row in &mut self.rows {
            row.insert(column, value.clone());
        }
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    /// Checks that every one of `keys` is a column of this row-set.
    pub fn require_columns(&self, keys: &[&str]) -> Result<(), RowSetError> {
        if keys.is_empty() {
            return Err(RowSetError::NoKeyColumns);
        }
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !self.has_column(key))
            .map(|key| key.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RowSetError::MissingColumns(missing))
        }
    }

    /// The distinct key tuples over `keys`, in first-seen order.
    pub fn distinct_keys(&self, keys: &[&str]) -> Result<Vec<Vec<CellValue>>, RowSetError> {
        self.require_columns(keys)?;

        let mut seen = HashSet::with_capacity(self.rows.len());
        let mut distinct = Vec::new();
        for row in &self.rows {
            let tuple: Vec<CellValue> = keys
                .iter()
                .map(|key| row.get(key).map_or(CellValue::Null, CellValue::sanitized))
                .collect();
            if seen.insert(tuple.clone()) {
                distinct.push(tuple);
            }
        }
        Ok(distinct)
    }
}

impl FromIterator<FlatRow> for RowSet {
    fn from_iter<I: IntoIterator<Item = FlatRow>>(iter: I) -> Self {
        RowSet::from_rows(iter)
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a FlatRow;
    type IntoIter = std::slice::Iter<'a, FlatRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
