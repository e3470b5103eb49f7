use crate::types::row_set::RowSetError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    // Validation, raised before any SQL is issued.
    #[error("Table name must not be empty")]
    EmptyTableName,

    #[error("No key columns were given")]
    NoKeyColumns,

    #[error("Row-set is missing key columns: {0:?}")]
    MissingKeyColumns(Vec<String>),

    #[error("None of the allowed columns are present in the row-set")]
    EmptySelection,

    #[error("Key column '{column}' is null in at least one row")]
    NullKey { column: String },

    // Persistence, raised after the transaction was rolled back.
    #[error("{operation} failed and was rolled back: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to open database '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to create database directory for '{0}'")]
    CreateDir(PathBuf, #[source] std::io::Error),
}

impl SinkError {
    /// True for errors raised before touching the database.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SinkError::EmptyTableName
                | SinkError::NoKeyColumns
                | SinkError::MissingKeyColumns(_)
                | SinkError::EmptySelection
                | SinkError::NullKey { .. }
        )
    }
}

impl From<RowSetError> for SinkError {
    fn from(error: RowSetError) -> Self {
        match error {
            RowSetError::EmptySelection => SinkError::EmptySelection,
            RowSetError::MissingColumns(columns) => SinkError::MissingKeyColumns(columns),
            RowSetError::NoKeyColumns => SinkError::NoKeyColumns,
        }
    }
}
