//! A structured timeline request.
//!
//! The location and the dates are separate path segments of the timeline
//! endpoint (`{base}/{location}[/{start}[/{end}]]`). Optional parameters go in
//! the query string. Nothing is concatenated into the location text, so a
//! location containing `/`, `?` or `&` is percent-encoded as a single segment.

use crate::client::error::RequestError;
use chrono::NaiveDate;
use std::fmt;
use url::Url;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which days a request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpan {
    /// The provider's default: today plus the next 15 days.
    Forecast,
    /// A single calendar day.
    On(NaiveDate),
    /// An inclusive range of calendar days.
    Between { start: NaiveDate, end: NaiveDate },
}

/// Measurement units of the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitGroup {
    Us,
    Uk,
    Metric,
    Base,
}

impl UnitGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitGroup::Us => "us",
            UnitGroup::Uk => "uk",
            UnitGroup::Metric => "metric",
            UnitGroup::Base => "base",
        }
    }
}

/// Sections of the response the provider should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Days,
    Hours,
    Current,
    Alerts,
    Events,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Days => "days",
            Section::Hours => "hours",
            Section::Current => "current",
            Section::Alerts => "alerts",
            Section::Events => "events",
        }
    }
}

/// What to fetch: a location, a date span, and optional response options.
///
/// Constructors validate, so a `WeatherRequest` that exists can always be sent.
///
/// ```
/// use chrono::NaiveDate;
/// use weather_ingest::{Section, UnitGroup, WeatherRequest};
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
/// let request = WeatherRequest::between("43205", start, end)?
///     .with_unit_group(UnitGroup::Metric)
///     .with_include([Section::Days, Section::Current]);
/// # Ok::<(), weather_ingest::RequestError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherRequest {
    location: String,
    span: DateSpan,
    unit_group: Option<UnitGroup>,
    include: Vec<Section>,
}

impl WeatherRequest {
    /// The current conditions and the upcoming forecast days for `location`.
    pub fn forecast(location: impl Into<String>) -> Result<Self, RequestError> {
        Self::new(location.into(), DateSpan::Forecast)
    }

    /// A single historical (or future) day.
    pub fn on(location: impl Into<String>, date: NaiveDate) -> Result<Self, RequestError> {
        Self::new(location.into(), DateSpan::On(date))
    }

    /// An inclusive date range. `start == end` is allowed; `start > end` is not.
    pub fn between(
        location: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, RequestError> {
        if start > end {
            return Err(RequestError::InvertedRange { start, end });
        }
        Self::new(location.into(), DateSpan::Between { start, end })
    }

    fn new(location: String, span: DateSpan) -> Result<Self, RequestError> {
        let location = location.trim().to_string();
        if location.is_empty() {
            return Err(RequestError::EmptyLocation);
        }
        Ok(Self {
            location,
            span,
            unit_group: None,
            include: Vec::new(),
        })
    }

    pub fn with_unit_group(mut self, unit_group: UnitGroup) -> Self {
        self.unit_group = Some(unit_group);
        self
    }

    /// Adds response sections; duplicates are ignored.
    pub fn with_include(mut self, sections: impl IntoIterator<Item = Section>) -> Self {
        for section in sections {
            if !self.include.contains(&section) {
                self.include.push(section);
            }
        }
        self
    }

    /// The trimmed location as given, before the provider resolves it.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn span(&self) -> DateSpan {
        self.span
    }

    /// The request URL under `base`, without any credentials.
    pub fn to_url(&self, base: &Url) -> Result<Url, RequestError> {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RequestError::CannotBeABase(base.to_string()))?;
            segments.pop_if_empty().push(&self.location);
            match self.span {
                DateSpan::Forecast => {}
                DateSpan::On(date) => {
                    segments.push(&date.format(DATE_FORMAT).to_string());
                }
                DateSpan::Between { start, end } => {
                    segments
                        .push(&start.format(DATE_FORMAT).to_string())
                        .push(&end.format(DATE_FORMAT).to_string());
                }
            }
        }

        {
            let mut query = url.query_pairs_mut();
            if let Some(unit_group) = self.unit_group {
                query.append_pair("unitGroup", unit_group.as_str());
            }
            if !self.include.is_empty() {
                let include = self
                    .include
                    .iter()
                    .map(Section::as_str)
                    .collect::<Vec<_>>()
                    .join(",");
                query.append_pair("include", &include);
            }
            query.append_pair("contentType", "json");
        }
        Ok(url)
    }
}

impl fmt::Display for WeatherRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            DateSpan::Forecast => write!(f, "forecast for {}", self.location),
            DateSpan::On(date) => write!(f, "{} on {}", self.location, date),
            DateSpan::Between { start, end } => {
                write!(f, "{} from {} to {}", self.location, start, end)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://weather.example.com/rest/services/timeline/").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn forecast_url_has_only_the_location_segment() -> Result<(), Box<dyn std::error::Error>> {
        let url = WeatherRequest::forecast("43205")?.to_url(&base())?;
        assert_eq!(
            url.as_str(),
            "https://weather.example.com/rest/services/timeline/43205?contentType=json"
        );
        Ok(())
    }

    #[test]
    fn dates_are_separate_path_segments() -> Result<(), Box<dyn std::error::Error>> {
        let url = WeatherRequest::between("Columbus, OH", date(2025, 1, 1), date(2025, 1, 7))?
            .to_url(&base())?;
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(
            segments,
            vec![
                "rest",
                "services",
                "timeline",
                "Columbus,%20OH",
                "2025-01-01",
                "2025-01-07"
            ]
        );

        let url = WeatherRequest::on("43205", date(2024, 12, 31))?.to_url(&base())?;
        assert!(url.path().ends_with("/43205/2024-12-31"));
        Ok(())
    }

    #[test]
    fn location_cannot_smuggle_query_text() -> Result<(), Box<dyn std::error::Error>> {
        let url = WeatherRequest::forecast("43205?date=2025-01-01&x=1")?.to_url(&base())?;
        assert_eq!(url.query(), Some("contentType=json"));
        assert!(url.path().ends_with("/43205%3Fdate=2025-01-01&x=1"));
        Ok(())
    }

    #[test]
    fn options_become_query_pairs() -> Result<(), Box<dyn std::error::Error>> {
        let url = WeatherRequest::forecast("43205")?
            .with_unit_group(UnitGroup::Metric)
            .with_include([Section::Days, Section::Current, Section::Days])
            .to_url(&base())?;
        assert_eq!(
            url.query(),
            Some("unitGroup=metric&include=days%2Ccurrent&contentType=json")
        );
        Ok(())
    }

    #[test]
    fn invalid_requests_are_rejected() {
        assert_eq!(
            WeatherRequest::forecast("   "),
            Err(RequestError::EmptyLocation)
        );
        assert_eq!(
            WeatherRequest::between("43205", date(2025, 2, 1), date(2025, 1, 1)),
            Err(RequestError::InvertedRange {
                start: date(2025, 2, 1),
                end: date(2025, 1, 1)
            })
        );
        assert!(WeatherRequest::between("43205", date(2025, 1, 1), date(2025, 1, 1)).is_ok());
    }

    #[test]
    fn base_without_path_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let base = Url::parse("mailto:someone@example.com")?;
        let result = WeatherRequest::forecast("43205")?.to_url(&base);
        assert!(matches!(result, Err(RequestError::CannotBeABase(_))));
        Ok(())
    }
}
