use std::time::Duration;

use chrono::{DateTime, Utc};

/// Staleness bound for the last successful sync.
pub const STALENESS_BOUND: Duration = Duration::from_secs(60 * 60);

/// True when a successful sync happened and it is older than `bound`.
///
/// Annotation only; it never changes what the engine does.
pub fn is_stale(last_synced_at: Option<DateTime<Utc>>, now: DateTime<Utc>, bound: Duration) -> bool {
    let Some(last) = last_synced_at else {
        return false;
    };
    let Ok(bound) = chrono::Duration::from_std(bound) else {
        return false;
    };
    now - last > bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 17, h, m, s).unwrap()
    }

    #[test]
    fn test_never_synced_is_not_stale() {
        assert!(!is_stale(None, at(12, 0, 0), STALENESS_BOUND));
        assert!(!is_stale(None, at(12, 0, 0) + ChronoDuration::days(365), STALENESS_BOUND));
    }

    #[test]
    fn test_bound_is_exclusive() {
        let last = at(10, 0, 0);
        assert!(!is_stale(Some(last), at(10, 59, 59), STALENESS_BOUND));
        assert!(!is_stale(Some(last), at(11, 0, 0), STALENESS_BOUND));
        assert!(is_stale(Some(last), at(11, 0, 1), STALENESS_BOUND));
    }

    #[test]
    fn test_future_sync_time_is_not_stale() {
        assert!(!is_stale(Some(at(12, 0, 0)), at(11, 0, 0), STALENESS_BOUND));
    }
}
