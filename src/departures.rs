//! # Departure Data Fetching
//!
//! This module handles the one network operation the sign performs per
//! rotation: fetching the current departures near the sign from the transit
//! API and parsing them into a typed [`DepartureSnapshot`].
//!
//! ## Data Source
//! - **URL**: `{api.url}/departures?lat={lat}&lon={lon}`
//! - **Auth**: `x-api-key` header carrying the configured secret
//! - **Format**: JSON, `{ routes: [...], message?: [...] }`
//!
//! ## Error Handling
//! Anything other than HTTP 200 with a well-formed body is a failed fetch:
//! - **Transport failures**: DNS, connect, TLS, timeout
//! - **Status failures**: non-200 responses, logged with up to 200 characters
//!   of the response body
//! - **Parse failures**: missing or wrong-typed fields, unknown departure kinds
//!
//! A failed fetch never touches the snapshot already on display.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ApiConfig, GeoConfig};
use crate::connectivity::{Connectivity, NetworkLink, Severity, TelemetryLink};
use crate::DepartureSnapshot;

/// Longest response body excerpt included in a failure log
pub const BODY_LOG_LIMIT: usize = 200;

/// Transport timeout for one departures request
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while fetching departures.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request never produced a response
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with something other than 200 OK
    #[error("HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The body was not a valid departures document
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

/// Where departure snapshots come from.
pub trait DepartureSource {
    /// Human-readable request target, for logs
    fn endpoint(&self) -> &str;

    /// Perform one request and parse the result.
    fn fetch(&self) -> impl Future<Output = Result<DepartureSnapshot, FetchError>>;
}

/// Departures API client over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpDepartureSource {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpDepartureSource {
    pub fn new(api: &ApiConfig, geo: &GeoConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            url: departures_url(&api.url, geo.lat, geo.lon),
            api_key: api.secret.clone(),
        }
    }
}

impl DepartureSource for HttpDepartureSource {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<DepartureSnapshot, FetchError> {
        // The response (and its connection) is dropped on every return path
        let response = self
            .http
            .get(&self.url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Build the departures request URL for a location.
pub fn departures_url(base: &str, lat: f64, lon: f64) -> String {
    format!(
        "{}/departures?lat={}&lon={}",
        base.trim_end_matches('/'),
        lat,
        lon
    )
}

/// Fetch a fresh snapshot into `snapshot`.
///
/// Returns `true` and replaces the snapshot on success. On failure the
/// previous snapshot is left as it was, an error record is logged, and
/// `false` is returned.
pub async fn fetch_departures<S, N, T>(
    source: &S,
    snapshot: &mut Option<DepartureSnapshot>,
    connectivity: &mut Connectivity<N, T>,
) -> bool
where
    S: DepartureSource,
    N: NetworkLink,
    T: TelemetryLink,
{
    connectivity.log(
        Severity::Debug,
        &format!("API request: {}", source.endpoint()),
    );

    match source.fetch().await {
        Ok(fresh) => {
            tracing::info!("Successfully fetched departures");
            *snapshot = Some(fresh);
            true
        }
        Err(error) => {
            connectivity.log(Severity::Error, &describe_failure(&error));
            false
        }
    }
}

/// Log text for a failed fetch.
pub fn describe_failure(error: &FetchError) -> String {
    match error {
        FetchError::Status { status, body } => {
            let mut message = format!("API request failed: HTTP {status}");
            if !body.is_empty() {
                message.push_str(" - ");
                message.push_str(&truncate_body(body));
            }
            message
        }
        FetchError::Parse(e) => format!("API JSON parse failed: {e}"),
        FetchError::Transport(e) => format!("API request failed: {e}"),
    }
}

/// Cap a response body at [`BODY_LOG_LIMIT`] characters, marking the cut.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(BODY_LOG_LIMIT) {
        None => body.to_string(),
        Some((cut, _)) => format!("{}...", &body[..cut]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNetwork, FakeTelemetry};
    use crate::DepartureKind;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::get,
        Router,
    };
    use std::collections::HashMap;

    const SAMPLE: &str = include_str!("tests/fixtures/departures.json");

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn source(base: &str) -> HttpDepartureSource {
        HttpDepartureSource::new(
            &ApiConfig {
                url: base.to_string(),
                secret: "s3cret".to_string(),
            },
            &GeoConfig {
                lat: 41.8781,
                lon: -87.6298,
            },
        )
    }

    fn connected() -> Connectivity<FakeNetwork, FakeTelemetry> {
        let mut link = FakeTelemetry::default();
        link.connected = true;
        Connectivity::new(FakeNetwork::associated()).with_telemetry(link, "sign-01", "logs")
    }

    fn published_levels(conn: &Connectivity<FakeNetwork, FakeTelemetry>) -> Vec<String> {
        conn.telemetry_link()
            .unwrap()
            .published
            .iter()
            .map(|(_, payload)| {
                let v: serde_json::Value = serde_json::from_slice(payload).unwrap();
                v["level"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn test_departures_url() {
        assert_eq!(
            departures_url("https://api.example.com/", 41.8781, -87.6298),
            "https://api.example.com/departures?lat=41.8781&lon=-87.6298"
        );
    }

    #[test]
    fn test_sample_parses_in_source_order() {
        let snapshot: DepartureSnapshot = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(snapshot.routes.len(), 7);

        let first = &snapshot.routes[0].directions[0];
        let minutes: Vec<u32> = first.departures.iter().map(|d| d.minutes).collect();
        assert_eq!(minutes, vec![7, 2, 15, 21]);
        assert_eq!(first.departures[1].kind, DepartureKind::RealTime);
        assert!(snapshot.message.is_some());
    }

    #[test]
    fn test_typed_parse_rejects_bad_documents() {
        // Missing headsign
        let missing = r#"{"routes":[{"name":"22","mode":"Bus","color":"ffffff",
            "directions":[{"departures":[]}]}]}"#;
        assert!(serde_json::from_str::<DepartureSnapshot>(missing).is_err());

        // Negative minutes
        let negative = r#"{"routes":[{"name":"22","mode":"Bus","color":"ffffff",
            "directions":[{"headsign":"North","departures":[{"type":"Scheduled","minutes":-1}]}]}]}"#;
        assert!(serde_json::from_str::<DepartureSnapshot>(negative).is_err());

        // Unknown departure kind
        let unknown = r#"{"routes":[{"name":"22","mode":"Bus","color":"ffffff",
            "directions":[{"headsign":"North","departures":[{"type":"Guess","minutes":3}]}]}]}"#;
        assert!(serde_json::from_str::<DepartureSnapshot>(unknown).is_err());
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");

        let exact = "x".repeat(BODY_LOG_LIMIT);
        assert_eq!(truncate_body(&exact), exact);

        let long = "y".repeat(BODY_LOG_LIMIT + 50);
        let cut = truncate_body(&long);
        assert_eq!(cut.len(), BODY_LOG_LIMIT + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_describe_status_failure() {
        let error = FetchError::Status {
            status: 500,
            body: String::new(),
        };
        assert_eq!(describe_failure(&error), "API request failed: HTTP 500");

        let error = FetchError::Status {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(describe_failure(&error), "API request failed: HTTP 503 - busy");
    }

    #[tokio::test]
    async fn test_fetch_sends_key_and_location() {
        let router = Router::new().route(
            "/departures",
            get(
                |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
                    let key_ok = headers.get("x-api-key").is_some_and(|v| v == "s3cret");
                    let geo_ok = query.get("lat").map(String::as_str) == Some("41.8781")
                        && query.get("lon").map(String::as_str) == Some("-87.6298");
                    if key_ok && geo_ok {
                        (AxumStatus::OK, SAMPLE.to_string())
                    } else {
                        (AxumStatus::FORBIDDEN, "denied".to_string())
                    }
                },
            ),
        );
        let base = serve(router).await;

        let snapshot = source(&base).fetch().await.unwrap();
        assert_eq!(snapshot.routes.len(), 7);
    }

    #[tokio::test]
    async fn test_http_error_keeps_previous_snapshot() {
        let body = "e".repeat(500);
        let router = Router::new().route(
            "/departures",
            get(move || async move { (AxumStatus::INTERNAL_SERVER_ERROR, body) }),
        );
        let base = serve(router).await;

        let previous: DepartureSnapshot = serde_json::from_str(SAMPLE).unwrap();
        let mut snapshot = Some(previous.clone());
        let mut conn = connected();

        assert!(!fetch_departures(&source(&base), &mut snapshot, &mut conn).await);
        assert_eq!(snapshot, Some(previous));
        assert_eq!(published_levels(&conn), vec!["DEBUG", "ERROR"]);

        let (_, payload) = conn.telemetry_link().unwrap().published.last().unwrap();
        let record: serde_json::Value = serde_json::from_slice(payload).unwrap();
        let message = record["message"].as_str().unwrap();
        assert!(message.starts_with("API request failed: HTTP 500 - eee"));
        assert_eq!(
            message.len(),
            "API request failed: HTTP 500 - ".len() + BODY_LOG_LIMIT + 3
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_failure() {
        let router = Router::new().route(
            "/departures",
            get(|| async { (AxumStatus::OK, "{\"routes\": [".to_string()) }),
        );
        let base = serve(router).await;

        let mut snapshot = None;
        let mut conn = connected();

        assert!(!fetch_departures(&source(&base), &mut snapshot, &mut conn).await);
        assert!(snapshot.is_none());

        let (_, payload) = conn.telemetry_link().unwrap().published.last().unwrap();
        let record: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert!(record["message"]
            .as_str()
            .unwrap()
            .starts_with("API JSON parse failed"));
    }

    #[tokio::test]
    async fn test_successful_fetch_replaces_snapshot() {
        let router = Router::new().route(
            "/departures",
            get(|| async { (AxumStatus::OK, SAMPLE.to_string()) }),
        );
        let base = serve(router).await;

        let mut snapshot = Some(DepartureSnapshot::default());
        let mut conn = connected();

        assert!(fetch_departures(&source(&base), &mut snapshot, &mut conn).await);
        assert_eq!(snapshot.unwrap().routes.len(), 7);
        assert_eq!(published_levels(&conn), vec!["DEBUG"]);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_failure() {
        // Bind then drop to get a port with nothing listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = source(&format!("http://{addr}")).fetch().await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
