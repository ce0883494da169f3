//! HTTP client for the device management backend.
//!
//! This module provides the `HttpDeviceSource` struct, a [`RemoteDataSource`]
//! that reads the device list over REST.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ApiError, FetchError, RemoteDataSource};
use crate::models::Device;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// The backend answers either with a bare array or wrapped in `devices`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DevicesResponse {
    List(Vec<Device>),
    Wrapped { devices: Vec<Device> },
}

impl DevicesResponse {
    fn into_devices(self) -> Vec<Device> {
        match self {
            DevicesResponse::List(devices) => devices,
            DevicesResponse::Wrapped { devices } => devices,
        }
    }
}

/// REST source for device data.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpDeviceSource {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDeviceSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/devices/{id}` with `id` escaped as a single path segment.
    fn device_url(&self, id: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("bad base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest(format!("base URL cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["devices", id]);
        Ok(url)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidRequest(format!("bad token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning `None` when rate limited.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// GET `url`, retrying on 429. Every await point observes `cancel`.
    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T, FetchError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let request = self.client.get(url).headers(self.auth_headers()?);

            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
                res = request.send() => res.map_err(ApiError::from)?,
            };

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return tokio::select! {
                        biased;
                        () = cancel.cancelled() => Err(FetchError::Cancelled),
                        body = response.json::<T>() => body.map_err(|e| {
                            ApiError::InvalidResponse(format!("{}: {}", url, e)).into()
                        }),
                    };
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(FetchError::Cancelled),
                        () = tokio::time::sleep(Duration::from_millis(backoff_ms)) => {}
                    }
                    backoff_ms *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl RemoteDataSource for HttpDeviceSource {
    async fn fetch_all(&self, cancel: CancellationToken) -> Result<Vec<Device>, FetchError> {
        let url = format!("{}/devices", self.base_url);
        let response: DevicesResponse = self.get(&url, &cancel).await?;
        let devices = response.into_devices();
        debug!(count = devices.len(), "Devices fetched");
        Ok(devices)
    }

    async fn fetch_device(&self, id: &str, cancel: CancellationToken) -> Result<Device, FetchError> {
        let url = self.device_url(id)?;
        self.get(url.as_str(), &cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_list() {
        let json = r#"[{"id":"dev_003","name":"Gateway Unit 01","type":"gateway","status":"online","battery":null,"lastSeen":"2026-02-17T14:30:00.000Z","location":"Zone B"}]"#;
        let resp: DevicesResponse = serde_json::from_str(json).expect("Failed to parse devices test JSON");
        let devices = resp.into_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].battery, None);
    }

    #[test]
    fn test_parse_wrapped_list() {
        let json = r#"{"devices":[{"id":"dev_004","name":"Sensor Node 03","type":"motion","status":"offline","battery":15,"lastSeen":"2026-02-17T11:00:00.000Z","location":"Zone B"}]}"#;
        let resp: DevicesResponse = serde_json::from_str(json).expect("Failed to parse devices test JSON");
        assert_eq!(resp.into_devices()[0].id, "dev_004");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let source = HttpDeviceSource::new("http://localhost:8080/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(source.base_url(), "http://localhost:8080/api");
    }

    #[test]
    fn test_device_url_escapes_id() {
        let source = HttpDeviceSource::new("http://localhost:8080/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            source.device_url("dev_001").unwrap().as_str(),
            "http://localhost:8080/api/devices/dev_001"
        );
        assert_eq!(
            source.device_url("a/b?c#d").unwrap().as_str(),
            "http://localhost:8080/api/devices/a%2Fb%3Fc%23d"
        );

        let root = HttpDeviceSource::new("http://localhost", Duration::from_secs(1)).unwrap();
        assert_eq!(root.device_url("dev_002").unwrap().as_str(), "http://localhost/devices/dev_002");
    }

    #[test]
    fn test_auth_headers() {
        let source = HttpDeviceSource::new("http://localhost", Duration::from_secs(1))
            .unwrap()
            .with_token("abc".to_string());
        let headers = source.auth_headers().unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let source = HttpDeviceSource::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = source.fetch_all(cancel).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }
}
