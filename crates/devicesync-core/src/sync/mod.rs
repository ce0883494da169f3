//! Device list synchronization.
//!
//! This module provides the `SyncCoordinator`, which keeps the device list
//! usable offline and reconciles it with the remote source:
//!
//! - Cached devices are published at start without waiting on the network
//! - Only the most recently started attempt may change state or cache
//! - Superseded attempts are cancelled, not just ignored
//! - Automatic attempts are throttled; user refresh is not
//! - Failures and offline periods keep the last good data, flagged stale
//!   once the last success is older than an hour

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod projection;
pub mod staleness;
pub mod state;
pub mod throttle;
pub mod trigger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::SyncCoordinator;
pub use error::SyncError;
pub use projection::{status_banner, StateProjection};
pub use staleness::{is_stale, STALENESS_BOUND};
pub use state::{SyncState, SyncStatus};
pub use throttle::Throttle;
pub use trigger::{AttemptOutcome, LifecycleEvent, Trigger};
