use chrono::NaiveDate;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Failed building column '{column}'")]
    ColumnBuild {
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("Date range starts at {start} but ends earlier at {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}
