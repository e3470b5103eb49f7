//! Turns a raw provider response into the current-conditions row and the
//! per-day forecast rows.

use crate::flatten::error::FlattenError;
use crate::flatten::walk::{flatten_object, flatten_value_into};
use crate::logging::Logger;
use crate::types::cell_value::CellValue;
use crate::types::flat_row::FlatRow;
use crate::types::forecast_schema::{forecast_column_names, is_epoch_column, BASE_FIELDS};
use crate::types::row_set::RowSet;
use serde_json::{Map, Value};

const CURRENT_KEY: &str = "currentConditions";
const DAYS_KEY: &str = "days";
const CURRENT_SUFFIX: &str = "_current";
const FORECAST_SUFFIX: &str = "_forecast";

/// Optional objects of a current-conditions snapshot that are expanded with their key as prefix.
const SNAPSHOT_PREFIXED_KEYS: [&str; 2] = ["location", "request"];
const SNAPSHOT_CURRENT_KEY: &str = "current";

/// The two tables produced from one response.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedWeather {
    /// Base fields merged with every key of `currentConditions`.
    pub current: FlatRow,
    /// One row per element of `days`, each starting with the base fields.
    pub forecast: RowSet,
}

impl FlattenedWeather {
    /// The current-conditions row as a one-row row-set.
    pub fn current_rows(&self) -> RowSet {
        RowSet::from_rows([self.current.clone()])
    }

    /// Forecast rows restricted to the persisted allow-list.
    pub fn forecast_table(&self) -> Result<RowSet, FlattenError> {
        Ok(self.forecast.select(&forecast_column_names())?)
    }
}

/// Flattens provider responses. Pure apart from debug logging.
#[derive(Debug, Clone, Default)]
pub struct Flattener {
    logger: Logger,
}

impl Flattener {
    /// A flattener logging under `weather_ingest::flatten`.
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: logger.with_target("weather_ingest::flatten"),
        }
    }

    /// Flattens a timeline response (`currentConditions` object plus `days` array).
    ///
    /// # Errors
    ///
    /// Returns [`FlattenError::MissingKey`] when `currentConditions` or `days` is absent,
    /// [`FlattenError::UnexpectedShape`] when either has the wrong JSON type (or a day is
    /// not an object), and [`FlattenError::InvalidEpoch`] when an `*Epoch*` column holds
    /// something other than integral seconds. Nothing is produced on error.
    pub fn flatten(&self, raw: &Value) -> Result<FlattenedWeather, FlattenError> {
        let document = raw.as_object().ok_or(FlattenError::NotAnObject)?;
        let current = required_object(document, CURRENT_KEY)?;
        let days = required_array(document, DAYS_KEY)?;

        let base = base_row(document);

        let current_fields = current.map(flatten_object).unwrap_or_default();
        let mut current_row = base.merged_with(&current_fields, CURRENT_SUFFIX);
        render_epochs(&mut current_row)?;

        let day_rows = days
            .iter()
            .enumerate()
            .map(|(index, day)| match day {
                Value::Object(map) => Ok(flatten_object(map)),
                other => Err(FlattenError::UnexpectedShape {
                    key: format!("{DAYS_KEY}[{index}]"),
                    expected: "an object",
                    found: shape_name(other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut forecast = RowSet::cross_join(&base, day_rows, FORECAST_SUFFIX);
        for row in forecast.rows_mut() {
            render_epochs(row)?;
        }

        self.logger.debug(format_args!(
            "Flattened response for {}: {} current columns, {} forecast rows",
            base.get("location").map(ToString::to_string).unwrap_or_default(),
            current_row.len(),
            forecast.len()
        ));

        Ok(FlattenedWeather {
            current: current_row,
            forecast,
        })
    }

    /// Flattens a current-conditions snapshot shaped
    /// `{ "location": {..}, "request": {..}, "current": {..} }` into one row.
    ///
    /// `location` and `request` become `location_*` / `request_*` columns. The keys of
    /// `current` are taken as-is, with nested objects such as `air_quality` or `astro`
    /// expanded under their own prefix and lists joined. Any of the three may be absent.
    pub fn flatten_snapshot(&self, raw: &Value) -> Result<FlatRow, FlattenError> {
        let document = raw.as_object().ok_or(FlattenError::NotAnObject)?;

        let mut row = FlatRow::new();
        for key in SNAPSHOT_PREFIXED_KEYS {
            match document.get(key) {
                None | Some(Value::Null) => {}
                Some(value) => flatten_value_into(key, value, &mut row),
            }
        }

        match document.get(SNAPSHOT_CURRENT_KEY) {
            None | Some(Value::Null) => {}
            Some(Value::Object(current)) => {
                for (column, value) in flatten_object(current).iter() {
                    row.insert(column, value.clone());
                }
            }
            Some(other) => {
                return Err(FlattenError::UnexpectedShape {
                    key: SNAPSHOT_CURRENT_KEY.to_string(),
                    expected: "an object",
                    found: shape_name(other),
                })
            }
        }

        render_epochs(&mut row)?;
        self.logger
            .debug(format_args!("Flattened snapshot into {} columns", row.len()));
        Ok(row)
    }
}

/// The base fields, renamed. Absent source keys become `Null`.
fn base_row(document: &Map<String, Value>) -> FlatRow {
    let mut row = FlatRow::new();
    for (column, source) in BASE_FIELDS {
        match document.get(source) {
            Some(value) => flatten_value_into(column, value, &mut row),
            None => row.insert(column, CellValue::Null),
        }
    }
    row
}

/// `Ok(None)` for an explicit `null`, which is treated as an empty object.
fn required_object<'a>(
    document: &'a Map<String, Value>,
    key: &'static str,
) -> Result<Option<&'a Map<String, Value>>, FlattenError> {
    match document.get(key) {
        None => Err(FlattenError::MissingKey(key)),
        Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(FlattenError::UnexpectedShape {
            key: key.to_string(),
            expected: "an object",
            found: shape_name(other),
        }),
    }
}

fn required_array<'a>(
    document: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a [Value], FlattenError> {
    match document.get(key) {
        None => Err(FlattenError::MissingKey(key)),
        Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(FlattenError::UnexpectedShape {
            key: key.to_string(),
            expected: "an array",
            found: shape_name(other),
        }),
    }
}

/// Replaces epoch seconds in every `*Epoch*` column with a UTC-naive timestamp.
pub fn render_epochs(row: &mut FlatRow) -> Result<(), FlattenError> {
    for (column, value) in row.iter_mut() {
        if !is_epoch_column(column) {
            continue;
        }
        if value.is_missing() {
            *value = CellValue::Null;
            continue;
        }
        match value.epoch_to_timestamp() {
            Some(ts) => *value = CellValue::Timestamp(ts),
            None => {
                return Err(FlattenError::InvalidEpoch {
                    column: column.to_string(),
                    value: value.to_string(),
                })
            }
        }
    }
    Ok(())
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
