//! The fetch → flatten → persist pipeline.
//!
//! [`ForecastIngest`] is the main entry point: it asks a [`WeatherSource`] for a
//! timeline response, flattens it with the [`Flattener`], and replaces the stored
//! forecast rows for that location and those days in one transaction.

use crate::client::request::WeatherRequest;
use crate::client::weather_client::{WeatherClient, WeatherSource};
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::flatten::flattener::{FlattenedWeather, Flattener};
use crate::logging::Logger;
use crate::sink::table_sink::TableSink;
use crate::types::cell_value::CellValue;
use crate::types::flat_row::FlatRow;
use crate::types::forecast_schema::{DEFAULT_PLATFORM_NAME, FORECAST_KEY_COLUMNS, FORECAST_TABLE};
use bon::bon;

const LOCATION_COLUMN: &str = "location";

/// What one [`ForecastIngest::ingest`] call did.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    /// The provider's resolved address, as stored in the `location` column.
    pub location: String,
    /// Forecast days in the response.
    pub forecast_days: usize,
    /// Previously stored rows replaced by this fetch.
    pub deleted: usize,
    /// Rows written by this fetch.
    pub inserted: usize,
    /// The flattened current-conditions row (not persisted).
    pub current: FlatRow,
}

/// Wires a weather source, the flattener and a table sink together.
///
/// ```no_run
/// use weather_ingest::{ForecastIngest, IngestConfig, Logger, WeatherRequest};
///
/// # fn main() -> Result<(), weather_ingest::IngestError> {
/// let config = IngestConfig::from_env()?;
/// let mut ingest = ForecastIngest::from_config(&config, Logger::global())?;
///
/// let summary = ingest.ingest(&WeatherRequest::forecast("43205")?)?;
/// println!("{} rows stored for {}", summary.inserted, summary.location);
/// # Ok(())
/// # }
/// ```
pub struct ForecastIngest<S: WeatherSource> {
    source: S,
    flattener: Flattener,
    sink: TableSink,
    table: String,
    platform: String,
    logger: Logger,
}

#[bon]
impl<S: WeatherSource> ForecastIngest<S> {
    /// Builds a pipeline around an existing source and sink.
    ///
    /// `table` defaults to `weather_forecast` and `platform` to `Leaflink`. The
    /// table is not created here; call [`ForecastIngest::ensure_table`] for that.
    #[builder]
    pub fn new(
        source: S,
        sink: TableSink,
        #[builder(into, default = FORECAST_TABLE.to_string())] table: String,
        #[builder(into, default = DEFAULT_PLATFORM_NAME.to_string())] platform: String,
        #[builder(default)] logger: Logger,
    ) -> Self {
        Self {
            source,
            flattener: Flattener::new(logger.clone()),
            sink,
            table,
            platform,
            logger: logger.with_target("weather_ingest::ingest"),
        }
    }

    /// Creates the forecast table if it does not exist yet.
    pub fn ensure_table(&mut self) -> Result<(), IngestError> {
        Ok(self.sink.ensure_forecast_table(&self.table)?)
    }

    /// Fetches and flattens without writing anything.
    pub fn fetch_flattened(&self, request: &WeatherRequest) -> Result<FlattenedWeather, IngestError> {
        let raw = self.source.fetch(request)?;
        Ok(self.flattener.flatten(&raw)?)
    }

    /// Fetches `request`, flattens the response and replaces the stored forecast rows
    /// keyed on (`location`, `datetimeEpoch`).
    ///
    /// A response with the wrong shape fails before anything is written. A response
    /// with no forecast days writes nothing and reports zero rows. When the provider
    /// omits `resolvedAddress`, rows are keyed on the requested location.
    pub fn ingest(&mut self, request: &WeatherRequest) -> Result<IngestSummary, IngestError> {
        let mut flattened = self.fetch_flattened(request)?;
        fill_missing_location(&mut flattened, request.location());
        let location = flattened
            .current
            .get("location")
            .map(ToString::to_string)
            .unwrap_or_default();
        let forecast_days = flattened.forecast.len();

        if forecast_days == 0 {
            self.logger.warn(format_args!(
                "Response for {request} has no forecast days; nothing stored"
            ));
            return Ok(IngestSummary {
                location,
                forecast_days,
                deleted: 0,
                inserted: 0,
                current: flattened.current,
            });
        }

        let rows = flattened.forecast_table()?;
        let outcome =
            self.sink
                .replace_forecast(&self.table, &rows, &FORECAST_KEY_COLUMNS, &self.platform)?;

        self.logger.info(format_args!(
            "Stored {} forecast rows for {location} in {} ({} replaced)",
            outcome.inserted, self.table, outcome.deleted
        ));
        Ok(IngestSummary {
            location,
            forecast_days,
            deleted: outcome.deleted,
            inserted: outcome.inserted,
            current: flattened.current,
        })
    }

    /// The sink rows are written to.
    pub fn sink(&self) -> &TableSink {
        &self.sink
    }

    /// Mutable access to the sink, for queries and ad-hoc statements.
    pub fn sink_mut(&mut self) -> &mut TableSink {
        &mut self.sink
    }

    /// Name of the forecast table.
    pub fn table(&self) -> &str {
        &self.table
    }
}

fn fill_missing_location(flattened: &mut FlattenedWeather, requested: &str) {
    let missing = |row: &FlatRow| row.get(LOCATION_COLUMN).map_or(true, CellValue::is_missing);
    if missing(&flattened.current) {
        flattened.current.insert(LOCATION_COLUMN, requested);
    }
    for row in flattened.forecast.rows_mut() {
        if missing(row) {
            row.insert(LOCATION_COLUMN, requested);
        }
    }
}

impl ForecastIngest<WeatherClient> {
    /// The production stack: HTTP client, SQLite file sink, forecast table ensured.
    pub fn from_config(config: &IngestConfig, logger: Logger) -> Result<Self, IngestError> {
        let client = WeatherClient::from_config(&config.api, logger.clone())?;
        let sink = TableSink::open(&config.database, logger.clone())?
            .with_chunk_size(config.delete_chunk_size);

        let mut ingest = ForecastIngest::builder()
            .source(client)
            .sink(sink)
            .platform(config.platform_name.as_str())
            .logger(logger)
            .build();
        ingest.ensure_table()?;
        Ok(ingest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::{ClientError, RequestError};
    use crate::flatten::error::FlattenError;
    use crate::logging::testing::CaptureLog;
    use crate::types::cell_value::{epoch_seconds_to_naive, CellValue};
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct CannedSource(Value);

    impl WeatherSource for CannedSource {
        fn fetch(&self, _: &WeatherRequest) -> Result<Value, ClientError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    impl WeatherSource for FailingSource {
        fn fetch(&self, _: &WeatherRequest) -> Result<Value, ClientError> {
            Err(ClientError::Request(RequestError::EmptyLocation))
        }
    }

    fn response(days: Value) -> Value {
        json!({
            "resolvedAddress": "Columbus, OH 43205, United States",
            "timezone": "America/New_York",
            "tzoffset": -5.0,
            "description": "Cooling down.",
            "currentConditions": {"temp": 52.1, "conditions": ["Clear", "Windy"]},
            "days": days
        })
    }

    fn two_days() -> Value {
        json!([
            {"datetime": "2025-01-01", "datetimeEpoch": 1735689600, "temp": 47.2, "hours": [{"temp": 40.0}]},
            {"datetime": "2025-01-02", "datetimeEpoch": 1735776000, "temp": 35.6}
        ])
    }

    fn pipeline<S: WeatherSource>(source: S) -> Result<ForecastIngest<S>, Box<dyn std::error::Error>> {
        let mut ingest = ForecastIngest::builder()
            .source(source)
            .sink(TableSink::in_memory(Logger::noop())?)
            .build();
        ingest.ensure_table()?;
        Ok(ingest)
    }

    fn stored(ingest: &mut ForecastIngest<impl WeatherSource>) -> Result<crate::types::row_set::RowSet, Box<dyn std::error::Error>> {
        Ok(ingest.sink_mut().query_rows(
            "SELECT location, datetimeEpoch, temp, platform_name FROM weather_forecast ORDER BY datetimeEpoch",
            &[],
        )?)
    }

    fn request() -> WeatherRequest {
        WeatherRequest::forecast("43205").unwrap()
    }

    #[test]
    fn ingest_stores_one_row_per_day() -> Result<(), Box<dyn std::error::Error>> {
        let mut ingest = pipeline(CannedSource(response(two_days())))?;

        let summary = ingest.ingest(&request())?;

        assert_eq!(summary.location, "Columbus, OH 43205, United States");
        assert_eq!(summary.forecast_days, 2);
        assert_eq!((summary.deleted, summary.inserted), (0, 2));
        assert_eq!(summary.current.get("conditions"), Some(&CellValue::from("Clear, Windy")));

        let rows = stored(&mut ingest)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows.value(0, "datetimeEpoch").map(ToString::to_string),
            Some(CellValue::Timestamp(epoch_seconds_to_naive(1735689600).unwrap()).to_string())
        );
        assert_eq!(rows.value(1, "temp"), Some(&CellValue::Float(35.6)));
        assert_eq!(rows.value(0, "platform_name"), Some(&CellValue::from("Leaflink")));
        Ok(())
    }

    #[test]
    fn re_ingesting_replaces_instead_of_duplicating() -> Result<(), Box<dyn std::error::Error>> {
        let mut ingest = pipeline(CannedSource(response(two_days())))?;

        ingest.ingest(&request())?;
        let second = ingest.ingest(&request())?;

        assert_eq!((second.deleted, second.inserted), (2, 2));
        assert_eq!(stored(&mut ingest)?.len(), 2);
        Ok(())
    }

    #[test]
    fn malformed_response_persists_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let broken = json!({"resolvedAddress": "x", "days": [{"datetimeEpoch": 1}]});
        let mut ingest = pipeline(CannedSource(broken))?;

        let error = ingest.ingest(&request()).unwrap_err();

        assert!(matches!(
            error,
            IngestError::Flatten(FlattenError::MissingKey("currentConditions"))
        ));
        assert_eq!(stored(&mut ingest)?.len(), 0);
        Ok(())
    }

    #[test]
    fn source_errors_propagate() -> Result<(), Box<dyn std::error::Error>> {
        let mut ingest = pipeline(FailingSource)?;
        assert!(matches!(
            ingest.ingest(&request()),
            Err(IngestError::Client(ClientError::Request(RequestError::EmptyLocation)))
        ));
        Ok(())
    }

    #[test]
    fn response_without_days_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let capture = Arc::new(CaptureLog::default());
        let mut ingest = ForecastIngest::builder()
            .source(CannedSource(response(json!([]))))
            .sink(TableSink::in_memory(Logger::noop())?)
            .logger(Logger::new(capture.clone()))
            .build();
        ingest.ensure_table()?;

        let summary = ingest.ingest(&request())?;

        assert_eq!((summary.forecast_days, summary.inserted), (0, 0));
        assert!(capture
            .lines()
            .iter()
            .any(|line| line.starts_with("WARN weather_ingest::ingest:")));
        Ok(())
    }

    #[test]
    fn custom_table_and_platform_are_used() -> Result<(), Box<dyn std::error::Error>> {
        let mut ingest = ForecastIngest::builder()
            .source(CannedSource(response(two_days())))
            .sink(TableSink::in_memory(Logger::noop())?)
            .table("forecast_backfill")
            .platform("Backfill")
            .build();
        ingest.ensure_table()?;
        ingest.ingest(&request())?;

        let rows = ingest
            .sink_mut()
            .query_rows("SELECT DISTINCT platform_name FROM forecast_backfill", &[])?;
        assert_eq!(rows.column_values("platform_name"), vec![CellValue::from("Backfill")]);
        assert_eq!(ingest.table(), "forecast_backfill");
        Ok(())
    }

    #[test]
    fn unresolved_address_falls_back_to_the_requested_location() -> Result<(), Box<dyn std::error::Error>> {
        let document = json!({
            "timezone": "UTC",
            "currentConditions": {},
            "days": [{"datetime": "2025-01-01", "datetimeEpoch": 1735689600, "temp": 47.2}]
        });
        let mut ingest = pipeline(CannedSource(document))?;

        let first = ingest.ingest(&request())?;
        let second = ingest.ingest(&request())?;

        assert_eq!(first.location, "43205");
        assert_eq!((first.deleted, first.inserted), (0, 1));
        assert_eq!((second.deleted, second.inserted), (1, 1));
        let rows = stored(&mut ingest)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.value(0, "location"), Some(&CellValue::from("43205")));
        Ok(())
    }

    #[test]
    fn fetch_flattened_does_not_write() -> Result<(), Box<dyn std::error::Error>> {
        let mut ingest = pipeline(CannedSource(response(two_days())))?;

        let flattened = ingest.fetch_flattened(&request())?;

        assert_eq!(flattened.forecast.len(), 2);
        assert!(flattened.forecast.has_column("hours"));
        assert_eq!(stored(&mut ingest)?.len(), 0);
        Ok(())
    }
}
