// demos/ingest_forecast.rs
use polars::prelude::{col, lit};
use weather_ingest::{ForecastFrame, ForecastIngest, IngestConfig, IngestError, Logger, WeatherRequest};

fn main() -> Result<(), IngestError> {
    // Set RUST_LOG=info (or debug) to see what the pipeline does.
    env_logger::init();

    let location = std::env::args().nth(1).unwrap_or_else(|| "43205".to_string());

    // ACCESS_KEY, DB_PATH and friends come from the environment or a .env file.
    let config = IngestConfig::from_env()?;
    let mut ingest = ForecastIngest::from_config(&config, Logger::global())?;

    let request = WeatherRequest::forecast(location)?;
    let summary = ingest.ingest(&request)?;
    println!(
        "Stored {} forecast days for {} ({} previous rows replaced)",
        summary.inserted, summary.location, summary.deleted
    );

    // Read the stored rows back and look at the days with the least daylight.
    let stored = ingest.sink_mut().query_rows(
        "SELECT location, datetimeEpoch, tempmax, tempmin, sunriseEpoch, sunsetEpoch \
         FROM weather_forecast WHERE location = ? ORDER BY datetimeEpoch",
        &[summary.location.as_str().into()],
    )?;
    println!("{} rows for this location in the table", stored.len());

    let fresh = ingest.fetch_flattened(&request)?.forecast_table()?;
    let short_days = ForecastFrame::from_rows(&fresh)?
        .short_days(10.0)
        .filter(col("tempmax").lt(lit(50.0)))
        .frame
        .collect()
        .map_err(weather_ingest::FrameError::from)?;
    println!("Cold days with under 10 hours of daylight:\n{short_days}");

    Ok(())
}
