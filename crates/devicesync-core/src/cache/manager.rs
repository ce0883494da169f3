use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::{KeyValueStore, StoreError};
use crate::models::Device;

/// Snapshot layout version this build reads and writes.
/// Any other stored version is ignored, never migrated.
pub const SCHEMA_VERSION: u32 = 1;

/// Storage key of the single device snapshot.
pub const DEFAULT_CACHE_KEY: &str = "devices_cache";

/// The persisted device collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub devices: Vec<Device>,
    pub captured_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl CacheSnapshot {
    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.captured_at).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        crate::utils::format_age(self.age_minutes(now))
    }
}

/// Only the version field, so an incompatible layout is detected before
/// the device list is decoded.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionProbe {
    schema_version: Option<u32>,
}

/// Reads and writes the device snapshot through a [`KeyValueStore`].
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    schema_version: u32,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: DEFAULT_CACHE_KEY.to_string(),
            schema_version: SCHEMA_VERSION,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Load the snapshot if one exists and matches the current schema version.
    ///
    /// Missing, unreadable, undecodable and version-mismatched records all
    /// come back as `None`.
    pub fn load(&self) -> Option<CacheSnapshot> {
        let bytes = match self.store.get(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                debug!(cache = %self.key, error = %e, "Failed to read cache");
                return None;
            }
        };

        match serde_json::from_slice::<VersionProbe>(&bytes) {
            Ok(probe) if probe.schema_version == Some(self.schema_version) => {}
            Ok(probe) => {
                debug!(
                    cache = %self.key,
                    stored = ?probe.schema_version,
                    expected = self.schema_version,
                    "Ignoring cache with mismatched schema version"
                );
                return None;
            }
            Err(e) => {
                debug!(cache = %self.key, error = %e, "Failed to parse cache");
                return None;
            }
        }

        match serde_json::from_slice::<CacheSnapshot>(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(cache = %self.key, error = %e, "Failed to parse cache");
                None
            }
        }
    }

    /// Overwrite the snapshot with `devices` captured at `captured_at`.
    pub fn save(&self, devices: &[Device], captured_at: DateTime<Utc>) -> Result<(), StoreError> {
        let snapshot = CacheSnapshot {
            devices: devices.to_vec(),
            captured_at,
            schema_version: self.schema_version,
        };
        let contents = serde_json::to_vec_pretty(&snapshot)?;
        self.store.set(&self.key, &contents)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }
}

// ============================================================================
// Tests
// ============================================================================
