use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::fetch_error::FetchError;

/// Production CO-OPS datagetter endpoint
pub const DEFAULT_API_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

const PRODUCT: &str = "monthly_mean";
const DATUM: &str = "STND";
const UNITS: &str = "metric";
const TIME_ZONE: &str = "gmt";
const FORMAT: &str = "json";

/// One monthly entry of a year response, as sent by the service
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawObservation {
    #[serde(deserialize_with = "coerce_int")]
    pub year: i32,
    #[serde(deserialize_with = "coerce_int")]
    pub month: u32,
    /// Monthly mean sea level in metres; empty when the month has no data
    #[serde(rename = "MSL", default, deserialize_with = "coerce_text")]
    pub height_text: String,
    #[serde(default, deserialize_with = "coerce_flag")]
    pub inferred: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationMetadata {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// The two shapes a datagetter response can take.
///
/// The service answers "no data for this period" with a top-level `error`
/// object instead of an HTTP error, so that shape is checked first.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DataGetterResponse {
    ServiceError {
        error: serde_json::Value,
    },
    Data {
        #[serde(default)]
        metadata: Option<StationMetadata>,
        data: Vec<RawObservation>,
    },
}

/// Source of one year of monthly observations for a station.
pub trait YearFetcher {
    fn fetch_year(
        &self,
        source_id: u32,
        year: i32,
    ) -> impl Future<Output = Result<Vec<RawObservation>, FetchError>> + Send;
}

#[derive(Clone)]
pub struct TideDataFetcher {
    client: reqwest::Client,
    url: String,
    application: String,
}

impl TideDataFetcher {
    pub fn new(url: String, application: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            application,
        }
    }

    /// Query string for one calendar year of monthly means
    pub fn query_params(&self, source_id: u32, year: i32) -> Vec<(&'static str, String)> {
        vec![
            ("station", source_id.to_string()),
            ("product", PRODUCT.to_string()),
            ("datum", DATUM.to_string()),
            ("units", UNITS.to_string()),
            ("time_zone", TIME_ZONE.to_string()),
            ("begin_date", format!("{year}0101")),
            ("end_date", format!("{year}1231")),
            ("format", FORMAT.to_string()),
            ("application", self.application.clone()),
        ]
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn request_year(
        &self,
        source_id: u32,
        year: i32,
    ) -> Result<Vec<RawObservation>, FetchError> {
        debug!("Sending HTTP request to datagetter");
        let response = self
            .client
            .get(&self.url)
            .query(&self.query_params(source_id, year))
            .send()
            .await?;

        let status = response.status();
        debug!("Received HTTP response with status: {}", status);
        if !status.is_success() {
            warn!("Datagetter returned {} for station {} year {}", status, source_id, year);
            return Err(FetchError::HttpStatus {
                url: response.url().to_string(),
                status,
            });
        }

        let body = response.text().await?;
        debug!("Retrieved response body, size: {} bytes", body.len());

        self.parse_body(&body)
    }

    #[instrument(skip(self, body), fields(body_size = body.len()))]
    fn parse_body(&self, body: &str) -> Result<Vec<RawObservation>, FetchError> {
        let response: DataGetterResponse = serde_json::from_str(body)?;

        match response {
            DataGetterResponse::ServiceError { error } => {
                debug!("Service reported no data: {}", service_message(&error));
                Ok(Vec::new())
            }
            DataGetterResponse::Data { metadata, data } => {
                if let Some(meta) = metadata {
                    debug!(
                        "Station metadata: id={:?}, name={:?}",
                        meta.id, meta.name
                    );
                }
                debug!("Decoded {} monthly observations", data.len());
                Ok(data)
            }
        }
    }
}

impl YearFetcher for TideDataFetcher {
    async fn fetch_year(
        &self,
        source_id: u32,
        year: i32,
    ) -> Result<Vec<RawObservation>, FetchError> {
        self.request_year(source_id, year).await
    }
}

fn service_message(error: &serde_json::Value) -> String {
    error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| error.to_string())
}

// The service encodes numbers as JSON strings; accept either form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

fn coerce_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFrom<i64>,
    <T as FromStr>::Err: Display,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text.trim().parse().map_err(de::Error::custom),
        Scalar::Integer(n) => T::try_from(n)
            .map_err(|_| de::Error::custom(format!("integer {n} out of range"))),
        other => Err(de::Error::custom(format!(
            "expected an integer, found {other:?}"
        ))),
    }
}

fn coerce_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(String::new()),
        Some(Scalar::Text(text)) => Ok(text),
        Some(Scalar::Integer(n)) => Ok(n.to_string()),
        Some(Scalar::Float(f)) => Ok(f.to_string()),
        Some(Scalar::Bool(b)) => Err(de::Error::custom(format!(
            "expected a number or string, found {b}"
        ))),
    }
}

fn coerce_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => false,
        Some(Scalar::Bool(b)) => b,
        Some(Scalar::Integer(n)) => n != 0,
        Some(Scalar::Float(f)) => f != 0.0,
        Some(Scalar::Text(text)) => {
            let text = text.trim();
            text == "1" || text.eq_ignore_ascii_case("true")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> TideDataFetcher {
        TideDataFetcher::new("".to_string(), "TestOrganization".to_string())
    }

    #[test]
    fn test_parse_body_with_data() {
        let body = r#"{
            "metadata": {"id": "8518750", "name": "The Battery", "lat": "40.7006", "lon": "-74.0142"},
            "data": [
                {"year": "2015", "month": "1", "highest": "2.207", "MSL": "0.803", "MTL": "0.811", "inferred": "0"},
                {"year": "2015", "month": "2", "highest": "1.942", "MSL": "", "MTL": "", "inferred": "1"}
            ]
        }"#;

        let result = fetcher().parse_body(body);
        assert!(result.is_ok(), "Parse failed: {:?}", result.err());

        let observations = result.unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(
            observations[0],
            RawObservation {
                year: 2015,
                month: 1,
                height_text: "0.803".to_string(),
                inferred: false,
            }
        );
        assert_eq!(observations[1].month, 2);
        assert_eq!(observations[1].height_text, "");
        assert!(observations[1].inferred);
    }

    #[test]
    fn test_parse_body_service_error_is_empty() {
        let body = r#"{"error": {"message": "No data was found. This product may not be offered at this station at the requested time."}}"#;

        let result = fetcher().parse_body(body);
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_parse_body_error_wins_over_data() {
        let body = r#"{"error": {"message": "bad"}, "data": [{"year": "2015", "month": "1", "MSL": "0.1"}]}"#;

        let observations = fetcher().parse_body(body).unwrap();
        assert!(observations.is_empty());
    }

    #[test]
    fn test_parse_body_accepts_numeric_fields() {
        let body = r#"{"data": [{"year": 2016, "month": 12, "MSL": 0.5, "inferred": true}]}"#;

        let observations = fetcher().parse_body(body).unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].year, 2016);
        assert_eq!(observations[0].month, 12);
        assert_eq!(observations[0].height_text, "0.5");
        assert!(observations[0].inferred);
    }

    #[test]
    fn test_parse_body_missing_or_null_msl_is_empty() {
        let body = r#"{"data": [{"year": "2015", "month": "3"}, {"year": "2015", "month": "4", "MSL": null}]}"#;

        let observations = fetcher().parse_body(body).unwrap();
        assert_eq!(observations.len(), 2);
        assert!(observations.iter().all(|o| o.height_text.is_empty()));
        assert!(observations.iter().all(|o| !o.inferred));
    }

    #[test]
    fn test_parse_body_unexpected_shape() {
        let result = fetcher().parse_body(r#"{"metadata": {"id": "1"}}"#);
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_parse_body_not_json() {
        let result = fetcher().parse_body("<html>Service unavailable</html>");
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_parse_body_non_numeric_year() {
        let result = fetcher().parse_body(r#"{"data": [{"year": "20x5", "month": "1", "MSL": "0.1"}]}"#);
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_query_params() {
        let params = fetcher().query_params(8518750, 2015);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(params.len(), 9);
        assert_eq!(get("station"), Some("8518750"));
        assert_eq!(get("product"), Some("monthly_mean"));
        assert_eq!(get("datum"), Some("STND"));
        assert_eq!(get("units"), Some("metric"));
        assert_eq!(get("time_zone"), Some("gmt"));
        assert_eq!(get("begin_date"), Some("20150101"));
        assert_eq!(get("end_date"), Some("20151231"));
        assert_eq!(get("format"), Some("json"));
        assert_eq!(get("application"), Some("TestOrganization"));
    }

    #[test]
    fn test_service_message_fallback() {
        assert_eq!(
            service_message(&serde_json::json!({"message": "No data"})),
            "No data"
        );
        assert_eq!(service_message(&serde_json::json!("oops")), "\"oops\"");
    }
}
