//! Contains `ForecastFrame`, a lazy polars view over flattened forecast rows for
//! analysis after (or instead of) persisting them.

use crate::frames::error::FrameError;
use crate::types::cell_value::CellValue;
use crate::types::row_set::RowSet;
use chrono::{Days, NaiveDate, NaiveDateTime};
use polars::prelude::{
    col, lit, when, Column, DataFrame, DataType, Expr, IntoLazy, LazyFrame, NamedFrom, Series,
    TimeUnit, NULL,
};

const DATETIME_DTYPE: DataType = DataType::Datetime(TimeUnit::Milliseconds, None);

/// The polars dtype chosen for one row-set column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Timestamp,
    Text,
}

fn infer_kind(values: &[CellValue]) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in values {
        let this = match value {
            CellValue::Null => continue,
            CellValue::Int(_) => ColumnKind::Int,
            CellValue::Float(_) => ColumnKind::Float,
            CellValue::Bool(_) => ColumnKind::Bool,
            CellValue::Timestamp(_) => ColumnKind::Timestamp,
            CellValue::Text(_) | CellValue::List(_) => return ColumnKind::Text,
        };
        kind = Some(match (kind, this) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Int), ColumnKind::Float) | (Some(ColumnKind::Float), ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => return ColumnKind::Text,
        });
    }
    kind.unwrap_or(ColumnKind::Text)
}

/// Materialises a row-set as a `DataFrame`, one column per row-set column.
///
/// Dtypes are inferred per column: integers, floats (integers mixed with floats
/// widen to float), booleans, millisecond datetimes, and strings for everything
/// else. Missing cells are nulls.
pub fn rows_to_dataframe(rows: &RowSet) -> Result<DataFrame, FrameError> {
    let mut columns = Vec::with_capacity(rows.columns().len());
    for name in rows.columns() {
        let values = rows.column_values(name);
        let series = match infer_kind(&values) {
            ColumnKind::Int => Series::new(
                name.as_str().into(),
                values
                    .iter()
                    .map(|v| match v {
                        CellValue::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect::<Vec<Option<i64>>>(),
            ),
            ColumnKind::Float => Series::new(
                name.as_str().into(),
                values.iter().map(CellValue::as_f64).collect::<Vec<Option<f64>>>(),
            ),
            ColumnKind::Bool => Series::new(
                name.as_str().into(),
                values
                    .iter()
                    .map(|v| match v {
                        CellValue::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect::<Vec<Option<bool>>>(),
            ),
            ColumnKind::Timestamp => Series::new(
                name.as_str().into(),
                values
                    .iter()
                    .map(|v| match v {
                        CellValue::Timestamp(ts) => Some(ts.and_utc().timestamp_millis()),
                        _ => None,
                    })
                    .collect::<Vec<Option<i64>>>(),
            )
            .cast(&DATETIME_DTYPE)
            .map_err(|source| FrameError::ColumnBuild {
                column: name.clone(),
                source,
            })?,
            ColumnKind::Text => Series::new(
                name.as_str().into(),
                values
                    .iter()
                    .map(|v| (!v.is_missing()).then(|| v.to_string()))
                    .collect::<Vec<Option<String>>>(),
            ),
        };
        columns.push(Column::from(series));
    }
    Ok(DataFrame::new(columns)?)
}

/// A wrapper around a polars `LazyFrame` holding forecast rows.
///
/// Expects the allow-listed forecast columns, with `datetimeEpoch`, `sunriseEpoch`
/// and `sunsetEpoch` as datetimes (which is what [`rows_to_dataframe`] produces from
/// flattened rows). Nothing is computed until `.frame.collect()` is called.
#[derive(Clone)]
pub struct ForecastFrame {
    /// The underlying polars LazyFrame.
    pub frame: LazyFrame,
}

impl ForecastFrame {
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Builds a frame from stored or flattened forecast rows.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ColumnBuild`] if a column cannot be turned into a series.
    pub fn from_rows(rows: &RowSet) -> Result<Self, FrameError> {
        Ok(Self::new(rows_to_dataframe(rows)?.lazy()))
    }

    /// Applies an arbitrary polars predicate lazily.
    ///
    /// ```no_run
    /// # use weather_ingest::{ForecastFrame, RowSet};
    /// use polars::prelude::{col, lit};
    ///
    /// # fn run(rows: &RowSet) -> Result<(), Box<dyn std::error::Error>> {
    /// let wet_days = ForecastFrame::from_rows(rows)?.filter(col("precipprob").gt(lit(50.0)));
    /// println!("{}", wet_days.frame.collect()?);
    /// # Ok(())
    /// # }
    /// ```
    pub fn filter(&self, predicate: Expr) -> ForecastFrame {
        ForecastFrame::new(self.frame.clone().filter(predicate))
    }

    /// Keeps forecast days from `start` through `end`, inclusive, by `datetimeEpoch`.
    pub fn get_range(&self, start: NaiveDate, end: NaiveDate) -> Result<ForecastFrame, FrameError> {
        if start > end {
            return Err(FrameError::InvertedRange { start, end });
        }
        let from: NaiveDateTime = start.and_time(chrono::NaiveTime::MIN);
        // Exclusive upper bound; saturates at the last representable day.
        let until: NaiveDateTime = end
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(chrono::NaiveTime::MIN);

        Ok(self.filter(
            col("datetimeEpoch")
                .cast(DATETIME_DTYPE)
                .gt_eq(lit(from))
                .and(col("datetimeEpoch").cast(DATETIME_DTYPE).lt(lit(until))),
        ))
    }

    /// Adds `date`, `daylight_seconds`, `daylight_hours`, `weekday` (1 = Monday)
    /// and `day_of_week` (the English day name) to every row.
    ///
    /// Daylight is the absolute time between `sunriseEpoch` and `sunsetEpoch`; the
    /// weekday is taken from `sunriseEpoch`. Rows missing either value get nulls.
    pub fn with_daylight(&self) -> ForecastFrame {
        let sunrise_ms = col("sunriseEpoch")
            .cast(DATETIME_DTYPE)
            .dt()
            .timestamp(TimeUnit::Milliseconds);
        let sunset_ms = col("sunsetEpoch")
            .cast(DATETIME_DTYPE)
            .dt()
            .timestamp(TimeUnit::Milliseconds);
        let span_ms = sunset_ms - sunrise_ms;
        let abs_span_ms = when(span_ms.clone().lt(lit(0i64)))
            .then(lit(0i64) - span_ms.clone())
            .otherwise(span_ms)
            .cast(DataType::Float64);

        let weekday = col("sunriseEpoch")
            .cast(DATETIME_DTYPE)
            .dt()
            .weekday()
            .cast(DataType::Int32);

        ForecastFrame::new(self.frame.clone().with_columns([
            col("datetimeEpoch").cast(DataType::Date).alias("date"),
            (abs_span_ms.clone() / lit(1000.0))
                .cast(DataType::Int64)
                .alias("daylight_seconds"),
            (abs_span_ms / lit(3_600_000.0)).alias("daylight_hours"),
            weekday.clone().alias("weekday"),
            day_name(weekday).alias("day_of_week"),
        ]))
    }

    /// Days with less than `max_hours` of daylight (see [`ForecastFrame::with_daylight`]).
    pub fn short_days(&self, max_hours: f64) -> ForecastFrame {
        self.with_daylight()
            .filter(col("daylight_hours").lt(lit(max_hours)))
    }
}

fn day_name(weekday: Expr) -> Expr {
    let is = |day: i32| weekday.clone().eq(lit(day));
    when(is(1))
        .then(lit("Monday"))
        .when(is(2))
        .then(lit("Tuesday"))
        .when(is(3))
        .then(lit("Wednesday"))
        .when(is(4))
        .then(lit("Thursday"))
        .when(is(5))
        .then(lit("Friday"))
        .when(is(6))
        .then(lit("Saturday"))
        .when(is(7))
        .then(lit("Sunday"))
        .otherwise(lit(NULL).cast(DataType::String))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flattener::Flattener;
    use serde_json::json;

    fn forecast_rows() -> RowSet {
        let response = json!({
            "resolvedAddress": "Columbus, OH 43205, United States",
            "timezone": "America/New_York",
            "tzoffset": -5.0,
            "description": "Cooling down.",
            "currentConditions": {"temp": 52.1},
            "days": [
                {
                    "datetime": "2025-01-01",
                    "datetimeEpoch": 1735689600,
                    "temp": 47.2,
                    "precipprob": 10,
                    "sunriseEpoch": 1735735920,
                    "sunsetEpoch": 1735769640
                },
                {
                    "datetime": "2025-01-02",
                    "datetimeEpoch": 1735776000,
                    "temp": 35.6,
                    "precipprob": 80.5,
                    "sunriseEpoch": 1735822330,
                    "sunsetEpoch": 1735856088
                }
            ]
        });
        Flattener::default()
            .flatten(&response)
            .unwrap()
            .forecast_table()
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dtypes_are_inferred_per_column() -> Result<(), Box<dyn std::error::Error>> {
        let df = rows_to_dataframe(&forecast_rows())?;

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("location")?.dtype(), &DataType::String);
        assert_eq!(df.column("temp")?.dtype(), &DataType::Float64);
        // 10 and 80.5 widen to float.
        assert_eq!(df.column("precipprob")?.dtype(), &DataType::Float64);
        assert_eq!(df.column("datetimeEpoch")?.dtype(), &DATETIME_DTYPE);
        Ok(())
    }

    #[test]
    fn filter_applies_predicate() -> Result<(), Box<dyn std::error::Error>> {
        let frame = ForecastFrame::from_rows(&forecast_rows())?;
        let df = frame.filter(col("precipprob").gt(lit(50.0))).frame.collect()?;

        assert_eq!(df.height(), 1);
        assert_eq!(df.column("datetime")?.str()?.get(0), Some("2025-01-02"));
        Ok(())
    }

    #[test]
    fn get_range_is_inclusive() -> Result<(), Box<dyn std::error::Error>> {
        let frame = ForecastFrame::from_rows(&forecast_rows())?;

        let both = frame.get_range(date(2025, 1, 1), date(2025, 1, 2))?.frame.collect()?;
        assert_eq!(both.height(), 2);

        let second = frame.get_range(date(2025, 1, 2), date(2025, 1, 2))?.frame.collect()?;
        assert_eq!(second.height(), 1);
        assert_eq!(second.column("datetime")?.str()?.get(0), Some("2025-01-02"));

        assert!(matches!(
            frame.get_range(date(2025, 1, 3), date(2025, 1, 1)),
            Err(FrameError::InvertedRange { .. })
        ));
        Ok(())
    }

    #[test]
    fn daylight_and_weekday_are_derived() -> Result<(), Box<dyn std::error::Error>> {
        let df = ForecastFrame::from_rows(&forecast_rows())?
            .with_daylight()
            .frame
            .collect()?;

        let seconds = df.column("daylight_seconds")?.i64()?;
        assert_eq!(seconds.get(0), Some(1735769640 - 1735735920));
        assert_eq!(seconds.get(1), Some(1735856088 - 1735822330));

        let hours = df.column("daylight_hours")?.f64()?;
        assert!((hours.get(0).unwrap() - 33720.0 / 3600.0).abs() < 1e-9);

        // 2025-01-01 was a Wednesday.
        assert_eq!(df.column("weekday")?.i32()?.get(0), Some(3));
        assert_eq!(df.column("day_of_week")?.str()?.get(0), Some("Wednesday"));
        assert_eq!(df.column("day_of_week")?.str()?.get(1), Some("Thursday"));
        assert_eq!(df.column("date")?.dtype(), &DataType::Date);
        Ok(())
    }

    #[test]
    fn short_days_keeps_days_under_threshold() -> Result<(), Box<dyn std::error::Error>> {
        let frame = ForecastFrame::from_rows(&forecast_rows())?;

        // 9.37h and 9.38h of daylight.
        assert_eq!(frame.short_days(9.375).frame.collect()?.height(), 1);
        assert_eq!(frame.short_days(12.0).frame.collect()?.height(), 2);
        assert_eq!(frame.short_days(8.0).frame.collect()?.height(), 0);
        Ok(())
    }

    #[test]
    fn empty_rows_make_an_empty_frame() -> Result<(), Box<dyn std::error::Error>> {
        let df = rows_to_dataframe(&RowSet::new())?;
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 0);
        Ok(())
    }
}
