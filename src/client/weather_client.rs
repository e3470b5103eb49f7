//! Blocking HTTP client for the weather provider's timeline endpoint.

use crate::client::error::ClientError;
use crate::client::request::WeatherRequest;
use crate::config::ApiConfig;
use crate::logging::Logger;
use bon::bon;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Timeline endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline/";

/// Applied to the whole request (connect, send and read) unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can turn a [`WeatherRequest`] into a raw response document.
///
/// [`crate::ForecastIngest`] depends on this trait rather than on [`WeatherClient`],
/// so the pipeline can run against canned responses.
pub trait WeatherSource {
    fn fetch(&self, request: &WeatherRequest) -> Result<Value, ClientError>;
}

/// Fetches timeline documents over HTTP.
///
/// The access key is attached as the `key` query parameter when a request is
/// sent. It is never logged and never part of a URL stored in a [`ClientError`].
pub struct WeatherClient {
    http: Client,
    base_url: Url,
    access_key: String,
    logger: Logger,
}

#[bon]
impl WeatherClient {
    /// Builds a client.
    ///
    /// ```no_run
    /// # use weather_ingest::{WeatherClient, Logger};
    /// # use std::time::Duration;
    /// let client = WeatherClient::builder()
    ///     .access_key("my-key")
    ///     .timeout(Duration::from_secs(10))
    ///     .logger(Logger::global())
    ///     .build()?;
    /// # Ok::<(), weather_ingest::ClientError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidBaseUrl`] when `base_url` does not parse, and
    /// [`ClientError::ClientBuild`] when the TLS backend cannot be initialised.
    #[builder]
    pub fn new(
        #[builder(into)] access_key: String,
        base_url: Option<&str>,
        timeout: Option<Duration>,
        #[builder(default)] logger: Logger,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(base_url.to_string(), e))?;
        let http = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(ClientError::ClientBuild)?;

        Ok(Self::with_http(http, base_url, access_key, logger))
    }

    fn with_http(http: Client, base_url: Url, access_key: String, logger: Logger) -> Self {
        Self {
            http,
            base_url,
            access_key,
            logger: logger.with_target("weather_ingest::client"),
        }
    }

    /// A client with the key, base URL and timeout from `config`.
    pub fn from_config(config: &ApiConfig, logger: Logger) -> Result<Self, ClientError> {
        Self::builder()
            .access_key(config.access_key.as_str())
            .base_url(&config.base_url)
            .timeout(config.timeout)
            .logger(logger)
            .build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl WeatherSource for WeatherClient {
    fn fetch(&self, request: &WeatherRequest) -> Result<Value, ClientError> {
        let url = request.to_url(&self.base_url)?;
        let public_url = url.to_string();

        let mut keyed_url = url;
        keyed_url
            .query_pairs_mut()
            .append_pair("key", &self.access_key);

        self.logger
            .info(format_args!("Fetching {request} from {public_url}"));

        let response = self
            .http
            .get(keyed_url)
            .send()
            .map_err(|e| ClientError::NetworkRequest(public_url.clone(), e.without_url()))?;

        let status = response.status();
        if let Err(e) = response.error_for_status_ref() {
            self.logger
                .warn(format_args!("HTTP {status} for {public_url}"));
            return Err(ClientError::HttpStatus {
                url: public_url,
                status,
                source: e.without_url(),
            });
        }

        let document = response.json::<Value>().map_err(|e| ClientError::Decode {
            url: public_url.clone(),
            source: e.without_url(),
        })?;
        self.logger
            .debug(format_args!("Received response for {request}"));
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::testing::CaptureLog;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    /// Answers exactly one HTTP request and hands back its request line.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/timeline/", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            write!(
                stream,
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
            request_line
        });
        (base, handle)
    }

    fn client(base: &str, logger: Logger) -> WeatherClient {
        // Loopback traffic must not go through a proxy configured in the environment.
        let http = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        WeatherClient::with_http(http, Url::parse(base).unwrap(), "s3cret".into(), logger)
    }

    #[test]
    fn fetch_returns_parsed_json_and_sends_key() -> Result<(), Box<dyn std::error::Error>> {
        let (base, server) = serve_once("HTTP/1.1 200 OK", r#"{"resolvedAddress":"Columbus","days":[]}"#);
        let capture = Arc::new(CaptureLog::default());

        let document = client(&base, Logger::new(capture.clone()))
            .fetch(&WeatherRequest::forecast("43205")?)?;
        let request_line = server.join().unwrap();

        assert_eq!(document["resolvedAddress"], "Columbus");
        assert!(request_line.starts_with("GET /timeline/43205?contentType=json&key=s3cret "));
        assert!(capture.lines().iter().all(|line| !line.contains("s3cret")));
        assert!(capture
            .lines()
            .iter()
            .any(|line| line.starts_with("INFO weather_ingest::client: Fetching forecast for 43205")));
        Ok(())
    }

    #[test]
    fn error_status_is_reported_without_key() -> Result<(), Box<dyn std::error::Error>> {
        let (base, server) = serve_once("HTTP/1.1 401 Unauthorized", r#"{"error":"bad key"}"#);

        let result = client(&base, Logger::noop()).fetch(&WeatherRequest::forecast("43205")?);
        server.join().unwrap();

        match &result {
            Err(ClientError::HttpStatus { url, status, .. }) => {
                assert_eq!(*status, reqwest::StatusCode::UNAUTHORIZED);
                assert!(!url.contains("s3cret"));
            }
            other => panic!("expected an HTTP status error, got {other:?}"),
        }
        assert!(!format!("{result:?}").contains("s3cret"));
        Ok(())
    }

    #[test]
    fn non_json_body_is_a_decode_error() -> Result<(), Box<dyn std::error::Error>> {
        let (base, server) = serve_once("HTTP/1.1 200 OK", "Exceeded maximum daily cost");

        let result = client(&base, Logger::noop()).fetch(&WeatherRequest::forecast("43205")?);
        server.join().unwrap();

        assert!(matches!(result, Err(ClientError::Decode { .. })));
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = WeatherClient::builder()
            .access_key("k")
            .base_url("not a url")
            .build();
        assert!(matches!(result, Err(ClientError::InvalidBaseUrl(..))));
    }
}
