use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::FetchError;
use crate::models::Device;

/// Where device data comes from.
///
/// Implementations must return [`FetchError::Cancelled`] promptly once
/// `cancel` fires. The engine does not rely on it: results of superseded
/// calls are discarded regardless.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    /// Fetch the complete device list.
    async fn fetch_all(&self, cancel: CancellationToken) -> Result<Vec<Device>, FetchError>;

    /// Fetch a single device for a detail view.
    async fn fetch_device(&self, id: &str, cancel: CancellationToken) -> Result<Device, FetchError>;
}
