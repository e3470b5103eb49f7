use crate::types::row_set::RowSetError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FlattenError {
    #[error("Weather response is not a JSON object")]
    NotAnObject,

    #[error("Weather response is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("Weather response key '{key}' should be {expected}, found {found}")]
    UnexpectedShape {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Column '{column}' holds {value}, which is not valid epoch seconds")]
    InvalidEpoch { column: String, value: String },

    #[error(transparent)]
    Selection(#[from] RowSetError),
}
