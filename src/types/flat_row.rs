use crate::types::cell_value::CellValue;

/// One flattened table row: column name to scalar, in first-insertion order.
///
/// Column order matters because the sink inserts by explicit column list in the
/// order the row-set presents them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRow {
    cells: Vec<(String, CellValue)>,
}

impl FlatRow {
    /// An empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column` to `value`, keeping the column's original position if it already exists.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column, value)),
        }
    }

    /// The cell stored under `column`, if the row has that column.
    ///
    /// ```
    /// use weather_ingest::{CellValue, FlatRow};
    ///
    /// let mut row = FlatRow::new();
    /// row.insert("temp", 47.2);
    /// assert_eq!(row.get("temp"), Some(&CellValue::Float(47.2)));
    /// assert_eq!(row.get("snow"), None);
    /// ```
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Mutable access to the cell under `column`.
    pub fn get_mut(&mut self, column: &str) -> Option<&mut CellValue> {
        self.cells
            .iter_mut()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Whether the row has a cell for `column`. A `Null` cell still counts.
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// `(column, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Like [`FlatRow::iter`], with mutable values. Column names cannot be changed.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut CellValue)> {
        self.cells
            .iter_mut()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the row has no columns at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Merges `other` into a copy of `self`.
    ///
    /// Columns of `other` that collide with a column already in `self` are renamed
    /// to `{column}{suffix}`; the left-hand value is never overwritten.
    pub fn merged_with(&self, other: &FlatRow, suffix: &str) -> FlatRow {
        let mut merged = self.clone();
        for (column, value) in other.iter() {
            if self.contains(column) {
                merged.insert(format!("{column}{suffix}"), value.clone());
            } else {
                merged.insert(column, value.clone());
            }
        }
        merged
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for FlatRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = FlatRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut row = FlatRow::new();
        row.insert("temp", 50.0);
        row.insert("humidity", 70.0);
        row.insert("temp", 51.5);

        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["temp", "humidity"]);
        assert_eq!(row.get("temp"), Some(&CellValue::Float(51.5)));
    }

    #[test]
    fn merge_suffixes_colliding_columns() {
        let base: FlatRow = [("location", "Columbus, OH"), ("timezone", "America/New_York")]
            .into_iter()
            .collect();
        let day: FlatRow = [("timezone", "UTC"), ("datetime", "2025-01-01")]
            .into_iter()
            .collect();

        let merged = base.merged_with(&day, "_forecast");
        assert_eq!(
            merged.columns().collect::<Vec<_>>(),
            vec!["location", "timezone", "timezone_forecast", "datetime"]
        );
        assert_eq!(merged.get("timezone"), Some(&CellValue::from("America/New_York")));
        assert_eq!(merged.get("timezone_forecast"), Some(&CellValue::from("UTC")));
    }
}
