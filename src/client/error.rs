use chrono::NaiveDate;
use thiserror::Error;

/// A [`crate::WeatherRequest`] that cannot be sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Location must not be empty")]
    EmptyLocation,

    #[error("Date range starts at {start} but ends earlier at {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("Base URL '{0}' cannot take path segments")]
    CannotBeABase(String),
}

/// Errors of the weather client. URLs carried here never include the access key.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Invalid weather base URL '{0}'")]
    InvalidBaseUrl(String, #[source] url::ParseError),

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Response from {url} is not valid JSON")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
