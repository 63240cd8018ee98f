//! API client for the UIMS backend.
//!
//! Every request is a `POST` carrying the UID and password; the backend
//! signs in to UIMS on our behalf and answers with JSON.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::{ApiError, UIMS_ERROR_MARKER};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Full attendance fans out one UIMS request per course, so allow time.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const ATTENDANCE_ENDPOINT: &str = "attendance";
const FULL_ATTENDANCE_ENDPOINT: &str = "fullattendance";
const TIMETABLE_ENDPOINT: &str = "timetable";

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub uid: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("uid", &self.uid)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// API client for the UIMS backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn post(&self, endpoint: &str, credentials: &Credentials) -> Result<Value> {
        let url = self.endpoint_url(endpoint);
        debug!(url = %url, "Requesting payload");

        let response = self
            .client
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send POST request to {}", url))?;

        let response = Self::check_response(response).await?;
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        parse_payload(&text).with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    pub async fn fetch_attendance(&self, credentials: &Credentials) -> Result<Value> {
        self.post(ATTENDANCE_ENDPOINT, credentials).await
    }

    pub async fn fetch_full_attendance(&self, credentials: &Credentials) -> Result<Value> {
        self.post(FULL_ATTENDANCE_ENDPOINT, credentials).await
    }

    pub async fn fetch_timetable(&self, credentials: &Credentials) -> Result<Value> {
        self.post(TIMETABLE_ENDPOINT, credentials).await
    }

    /// Check credentials by fetching the cheapest payload.
    pub async fn verify(&self, credentials: &Credentials) -> Result<()> {
        self.fetch_attendance(credentials).await.map(|_| ())
    }
}

/// Parse a response body. UIMS-style bodies of the form `{"d": "<json>"}`
/// are unwrapped, since the inner value arrives as an escaped string.
fn parse_payload(text: &str) -> Result<Value, ApiError> {
    if text.contains(UIMS_ERROR_MARKER) {
        return Err(ApiError::UimsInternal);
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

    let wrapped = value
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.get("d"));
    if let Some(Value::String(inner)) = wrapped {
        return serde_json::from_str(inner)
            .map_err(|e| ApiError::InvalidResponse(format!("bad wrapped payload: {}", e)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payload_plain() {
        let value = parse_payload(r#"[{"Code":"CST-302"}]"#).unwrap();
        assert_eq!(value, json!([{"Code": "CST-302"}]));
    }

    #[test]
    fn test_parse_payload_unwraps_d() {
        let body = r#"{"d":"[{\"Code\":\"CST-302\",\"TotalAttd\":\"40\"}]"}"#;
        let value = parse_payload(body).unwrap();
        assert_eq!(value, json!([{"Code": "CST-302", "TotalAttd": "40"}]));
    }

    #[test]
    fn test_parse_payload_keeps_other_objects() {
        let value = parse_payload(r#"{"d": 5}"#).unwrap();
        assert_eq!(value, json!({"d": 5}));
        let value = parse_payload(r#"{"Monday": [], "Tuesday": []}"#).unwrap();
        assert_eq!(value["Monday"], json!([]));
    }

    #[test]
    fn test_parse_payload_errors() {
        assert!(matches!(parse_payload("<html>"), Err(ApiError::InvalidResponse(_))));
        assert!(matches!(
            parse_payload("Whoops, Something broke!"),
            Err(ApiError::UimsInternal)
        ));
        assert!(matches!(
            parse_payload(r#"{"d": "not json"}"#),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_endpoint_url_trims_slash() {
        let client = ApiClient::new("http://localhost:5000/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(
            client.endpoint_url(FULL_ATTENDANCE_ENDPOINT),
            "http://localhost:5000/api/fullattendance"
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials {
            uid: "20BCS1234".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("20BCS1234"));
        assert!(!debug.contains("hunter2"));
    }
}
