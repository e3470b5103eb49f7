//! Column layout of the persisted forecast table.

/// Name of the table forecast rows are written to unless the caller picks another.
pub const FORECAST_TABLE: &str = "weather_forecast";

/// Platform tag stamped on rows when none is configured.
pub const DEFAULT_PLATFORM_NAME: &str = "Leaflink";

/// Composite natural key of a forecast row.
pub const FORECAST_KEY_COLUMNS: [&str; 2] = ["location", "datetimeEpoch"];

/// The four top-level fields copied onto every row: (output column, source key).
pub const BASE_FIELDS: [(&str, &str); 4] = [
    ("location", "resolvedAddress"),
    ("timezone", "timezone"),
    ("timezone_offset", "tzoffset"),
    ("current_description", "description"),
];

/// A persisted forecast column and its SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastColumn {
    pub name: &'static str,
    pub sql_type: &'static str,
}

const fn column(name: &'static str, sql_type: &'static str) -> ForecastColumn {
    ForecastColumn { name, sql_type }
}

/// The allow-list: every column a forecast row may carry into the table, in table order.
pub const FORECAST_COLUMNS: [ForecastColumn; 35] = [
    column("location", "TEXT"),
    column("timezone", "TEXT"),
    column("timezone_offset", "REAL"),
    column("current_description", "TEXT"),
    column("datetime", "TIMESTAMP"),
    column("datetimeEpoch", "TIMESTAMP"),
    column("tempmax", "REAL"),
    column("tempmin", "REAL"),
    column("temp", "REAL"),
    column("feelslikemax", "REAL"),
    column("feelslikemin", "REAL"),
    column("feelslike", "REAL"),
    column("dew", "REAL"),
    column("humidity", "REAL"),
    column("precip", "REAL"),
    column("precipprob", "REAL"),
    column("precipcover", "REAL"),
    column("preciptype", "TEXT"),
    column("snow", "REAL"),
    column("snowdepth", "REAL"),
    column("windgust", "REAL"),
    column("windspeed", "REAL"),
    column("winddir", "REAL"),
    column("pressure", "REAL"),
    column("cloudcover", "REAL"),
    column("visibility", "REAL"),
    column("solarradiation", "REAL"),
    column("solarenergy", "REAL"),
    column("uvindex", "REAL"),
    column("severerisk", "REAL"),
    column("sunrise", "TEXT"),
    column("sunriseEpoch", "TIMESTAMP"),
    column("sunset", "TEXT"),
    column("sunsetEpoch", "TIMESTAMP"),
    column("moonphase", "REAL"),
];

/// Names of [`FORECAST_COLUMNS`], ready for [`crate::RowSet::select`].
pub fn forecast_column_names() -> Vec<&'static str> {
    FORECAST_COLUMNS.iter().map(|c| c.name).collect()
}

/// Whether values of `column` are epoch seconds to be rendered as timestamps.
pub fn is_epoch_column(column: &str) -> bool {
    column.contains("Epoch")
}
