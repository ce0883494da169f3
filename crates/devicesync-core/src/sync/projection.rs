//! Presentation-friendly flags derived from [`SyncState`].

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::state::{SyncState, SyncStatus};
use crate::utils::format_age;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateProjection {
    /// Show a full-screen loading affordance.
    pub blocking_load: bool,
    /// Show a non-blocking "syncing" indicator over existing data.
    pub background_activity: bool,
    /// Warn that the data shown may be outdated.
    pub is_stale: bool,
    /// Offer a manual retry.
    pub retry_available: bool,
}

impl StateProjection {
    pub fn from_state(state: &SyncState, now: DateTime<Utc>, staleness_bound: Duration) -> Self {
        let initial_syncing = state.status == SyncStatus::Syncing && state.initial_load;
        Self {
            blocking_load: state.status == SyncStatus::LoadingInitial || initial_syncing,
            background_activity: state.status == SyncStatus::Syncing && !state.initial_load,
            is_stale: state.is_stale(now, staleness_bound),
            retry_available: state.status == SyncStatus::Error,
        }
    }
}

/// One-line status banner, or `None` when there is nothing to say.
pub fn status_banner(state: &SyncState, now: DateTime<Utc>, staleness_bound: Duration) -> Option<String> {
    match state.status {
        SyncStatus::Idle => None,
        SyncStatus::LoadingInitial => Some("Loading devices...".to_string()),
        SyncStatus::Syncing => Some("Syncing...".to_string()),
        SyncStatus::Synced => state
            .last_synced_at
            .map(|at| format!("Updated {}", format_age((now - at).num_minutes()))),
        SyncStatus::Error => {
            if state.is_stale(now, staleness_bound) {
                Some("Sync failed - data may be outdated - retry available".to_string())
            } else {
                Some("Sync failed - retry available".to_string())
            }
        }
        SyncStatus::Offline => Some("Offline - showing cached data".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::STALENESS_BOUND;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0).unwrap()
    }

    fn state(status: SyncStatus, initial_load: bool) -> SyncState {
        SyncState {
            status,
            initial_load,
            ..SyncState::idle()
        }
    }

    #[test]
    fn test_blocking_load() {
        let p = StateProjection::from_state(&SyncState::loading_initial(), now(), STALENESS_BOUND);
        assert!(p.blocking_load);
        assert!(!p.background_activity);

        let p = StateProjection::from_state(&state(SyncStatus::Syncing, true), now(), STALENESS_BOUND);
        assert!(p.blocking_load);
        assert!(!p.background_activity);
    }

    #[test]
    fn test_background_activity() {
        let p = StateProjection::from_state(&state(SyncStatus::Syncing, false), now(), STALENESS_BOUND);
        assert!(!p.blocking_load);
        assert!(p.background_activity);
    }

    #[test]
    fn test_retry_and_stale_on_error() {
        let mut s = state(SyncStatus::Error, false);
        s.last_synced_at = Some(now() - ChronoDuration::minutes(90));
        s.error = Some("boom".to_string());
        let p = StateProjection::from_state(&s, now(), STALENESS_BOUND);
        assert!(p.retry_available);
        assert!(p.is_stale);
        assert_eq!(
            status_banner(&s, now(), STALENESS_BOUND).as_deref(),
            Some("Sync failed - data may be outdated - retry available")
        );
    }

    #[test]
    fn test_banner_texts() {
        assert_eq!(status_banner(&SyncState::idle(), now(), STALENESS_BOUND), None);

        let mut synced = state(SyncStatus::Synced, false);
        synced.last_synced_at = Some(now() - ChronoDuration::minutes(3));
        assert_eq!(status_banner(&synced, now(), STALENESS_BOUND).as_deref(), Some("Updated 3m ago"));

        let offline = state(SyncStatus::Offline, false);
        assert_eq!(
            status_banner(&offline, now(), STALENESS_BOUND).as_deref(),
            Some("Offline - showing cached data")
        );
    }
}
