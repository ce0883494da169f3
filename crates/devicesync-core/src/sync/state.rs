//! Externally observable sync state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::staleness;
use crate::cache::CacheSnapshot;
use crate::models::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// Nothing to report; any device data present is usable.
    Idle,
    /// No cached or fetched data yet.
    LoadingInitial,
    /// A reconciliation is in flight.
    Syncing,
    /// The latest reconciliation succeeded.
    Synced,
    /// The latest reconciliation failed.
    Error,
    /// No connectivity when the latest reconciliation was attempted.
    Offline,
}

impl SyncStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::LoadingInitial => "loading",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
            SyncStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One published view of the engine. Only the coordinator writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub status: SyncStatus,
    pub devices: Arc<Vec<Device>>,
    /// Time of the last successful reconciliation; survives failures.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Set only while `status` is `Error`.
    pub error: Option<String>,
    /// True from a cold start until the first attempt resolves.
    pub initial_load: bool,
}

impl SyncState {
    pub fn idle() -> Self {
        Self {
            status: SyncStatus::Idle,
            devices: Arc::new(Vec::new()),
            last_synced_at: None,
            error: None,
            initial_load: false,
        }
    }

    pub fn loading_initial() -> Self {
        Self {
            status: SyncStatus::LoadingInitial,
            initial_load: true,
            ..Self::idle()
        }
    }

    /// Warm start: cached devices are shown immediately.
    pub fn from_snapshot(snapshot: CacheSnapshot) -> Self {
        Self {
            devices: Arc::new(snapshot.devices),
            last_synced_at: Some(snapshot.captured_at),
            ..Self::idle()
        }
    }

    /// Stale means the last success is older than `bound` and the current
    /// status reports a failure to refresh.
    pub fn is_stale(&self, now: DateTime<Utc>, bound: Duration) -> bool {
        matches!(self.status, SyncStatus::Error | SyncStatus::Offline)
            && staleness::is_stale(self.last_synced_at, now, bound)
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SCHEMA_VERSION;
    use crate::sync::STALENESS_BOUND;
    use chrono::{Duration as ChronoDuration, TimeZone};

    #[test]
    fn test_warm_state_keeps_capture_time() {
        let at = Utc.with_ymd_and_hms(2026, 2, 17, 9, 0, 0).unwrap();
        let state = SyncState::from_snapshot(CacheSnapshot {
            devices: vec![],
            captured_at: at,
            schema_version: SCHEMA_VERSION,
        });
        assert_eq!(state.status, SyncStatus::Idle);
        assert_eq!(state.last_synced_at, Some(at));
        assert!(!state.initial_load);
    }

    #[test]
    fn test_stale_only_for_error_or_offline() {
        let at = Utc.with_ymd_and_hms(2026, 2, 17, 9, 0, 0).unwrap();
        let later = at + ChronoDuration::hours(2);
        let mut state = SyncState {
            last_synced_at: Some(at),
            ..SyncState::idle()
        };

        for status in [SyncStatus::Idle, SyncStatus::Syncing, SyncStatus::Synced] {
            state.status = status;
            assert!(!state.is_stale(later, STALENESS_BOUND), "{status} should not be stale");
        }
        for status in [SyncStatus::Error, SyncStatus::Offline] {
            state.status = status;
            assert!(state.is_stale(later, STALENESS_BOUND), "{status} should be stale");
        }
    }
}
