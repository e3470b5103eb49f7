mod client;
mod config;
mod error;
mod flatten;
mod frames;
mod ingest;
mod logging;
mod sink;
mod types;
mod utils;

pub use error::IngestError;
pub use ingest::*;
pub use logging::Logger;

pub use config::{
    ApiConfig, ConfigError, DatabaseConfig, IngestConfig, DEFAULT_BUSY_TIMEOUT,
    DEFAULT_DATABASE_NAME, DEFAULT_DATABASE_PORT, DEFAULT_DELETE_CHUNK_SIZE,
};

pub use client::error::{ClientError, RequestError};
pub use client::request::{DateSpan, Section, UnitGroup, WeatherRequest};
pub use client::weather_client::{WeatherClient, WeatherSource, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

pub use flatten::error::FlattenError;
pub use flatten::flattener::{render_epochs, FlattenedWeather, Flattener};
pub use flatten::walk::{flatten_object, flatten_value_into, join_scalars};

pub use sink::error::SinkError;
pub use sink::sql::{key_chunks, max_keys_per_statement, quote_identifier, MAX_BOUND_PARAMETERS};
pub use sink::table_sink::{ReplaceOutcome, TableSink};

pub use frames::error::FrameError;
pub use frames::forecast_frame::{rows_to_dataframe, ForecastFrame};

pub use types::cell_value::{epoch_seconds_to_naive, CellValue};
pub use types::flat_row::FlatRow;
pub use types::forecast_schema::*;
pub use types::row_set::{RowSet, RowSetError};
