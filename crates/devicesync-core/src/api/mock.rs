//! Simulated device backend for demos and offline development.
//!
//! Responds after a fixed delay, fails a configurable fraction of calls and
//! varies battery levels slightly between calls.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::{ApiError, FetchError, RemoteDataSource};
use crate::models::{Device, DeviceStatus};

/// Simulated round-trip time.
pub const MOCK_DELAY_MS: u64 = 1200;

/// Fraction of calls that fail. 1.0 always fails.
pub const MOCK_FAILURE_RATE: f64 = 0.1;

pub const MOCK_FAILURE_MESSAGE: &str = "Network request failed: server returned 503";

/// (id, name, type, status, battery, location)
const MOCK_DEVICES: &[(&str, &str, &str, &str, Option<u8>, &str)] = &[
    ("dev_001", "Sensor Node 01", "temperature", "online", Some(87), "Zone A"),
    ("dev_002", "Sensor Node 02", "humidity", "online", Some(62), "Zone A"),
    ("dev_003", "Gateway Unit 01", "gateway", "online", None, "Zone B"),
    ("dev_004", "Sensor Node 03", "motion", "offline", Some(15), "Zone B"),
    ("dev_005", "Sensor Node 04", "temperature", "online", Some(94), "Zone C"),
    ("dev_006", "Sensor Node 05", "pressure", "warning", Some(31), "Zone C"),
    ("dev_007", "Controller Unit", "controller", "online", None, "Zone A"),
    ("dev_008", "Sensor Node 06", "co2", "online", Some(78), "Zone D"),
    ("dev_009", "Sensor Node 07", "temperature", "offline", Some(0), "Zone D"),
    ("dev_010", "Access Point 01", "ap", "online", None, "Zone B"),
];

#[derive(Debug, Clone)]
pub struct MockDeviceSource {
    delay: Duration,
    failure_rate: f64,
}

impl Default for MockDeviceSource {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(MOCK_DELAY_MS),
            failure_rate: MOCK_FAILURE_RATE,
        }
    }
}

impl MockDeviceSource {
    pub fn new(delay: Duration, failure_rate: f64) -> Self {
        Self {
            delay,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    async fn simulate_latency(&self, delay: Duration, cancel: &CancellationToken) -> Result<(), FetchError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn maybe_fail(&self) -> Result<(), FetchError> {
        if rand::thread_rng().gen::<f64>() < self.failure_rate {
            return Err(FetchError::Transport(MOCK_FAILURE_MESSAGE.to_string()));
        }
        Ok(())
    }

    fn snapshot(jitter: bool) -> Vec<Device> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();
        MOCK_DEVICES
            .iter()
            .map(|&(id, name, device_type, status, battery, location)| Device {
                id: id.to_string(),
                name: name.to_string(),
                device_type: device_type.to_string(),
                status: DeviceStatus::from(status.to_string()),
                battery: battery.map(|level| {
                    if jitter {
                        (i16::from(level) + rng.gen_range(-1..=1)).clamp(0, 100) as u8
                    } else {
                        level
                    }
                }),
                last_seen: now,
                location: Some(location.to_string()),
            })
            .collect()
    }
}

#[async_trait]
impl RemoteDataSource for MockDeviceSource {
    async fn fetch_all(&self, cancel: CancellationToken) -> Result<Vec<Device>, FetchError> {
        self.simulate_latency(self.delay, &cancel).await?;
        self.maybe_fail()?;
        Ok(Self::snapshot(true))
    }

    async fn fetch_device(&self, id: &str, cancel: CancellationToken) -> Result<Device, FetchError> {
        self.simulate_latency(self.delay / 2, &cancel).await?;
        self.maybe_fail()?;
        Self::snapshot(false)
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Device not found: {}", id)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_all_devices() {
        let source = MockDeviceSource::new(Duration::ZERO, 0.0);
        let devices = source.fetch_all(CancellationToken::new()).await.unwrap();
        assert_eq!(devices.len(), 10);
        assert_eq!(devices[2].battery, None);
        assert_eq!(devices[5].status, DeviceStatus::Warning);
        assert!(devices.iter().all(|d| d.battery.map_or(true, |b| b <= 100)));
    }

    #[tokio::test]
    async fn test_mock_always_fails() {
        let source = MockDeviceSource::new(Duration::ZERO, 1.0);
        let err = source.fetch_all(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), MOCK_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_mock_honors_cancellation() {
        let source = MockDeviceSource::new(Duration::from_secs(60), 0.0);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = source.fetch_all(cancel).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_mock_fetch_device() {
        let source = MockDeviceSource::new(Duration::ZERO, 0.0);
        let device = source.fetch_device("dev_007", CancellationToken::new()).await.unwrap();
        assert_eq!(device.name, "Controller Unit");

        let missing = source.fetch_device("dev_999", CancellationToken::new()).await;
        assert!(matches!(missing, Err(FetchError::Api(ApiError::NotFound(_)))));
    }
}
