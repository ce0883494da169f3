//! Core library for devicesync.
//!
//! Keeps a device list usable while offline and reconciles it with a remote
//! source when connectivity allows, exposing one coherent sync state to the
//! presentation layer.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod network;
pub mod sync;
pub mod utils;

pub use api::{ApiError, FetchError, HttpDeviceSource, MockDeviceSource, RemoteDataSource};
pub use cache::{CacheSnapshot, CacheStore, FileStore, KeyValueStore, MemoryStore, StoreError};
pub use config::{Config, EngineConfig};
pub use models::{Device, DeviceStatus};
pub use network::{NetworkMonitor, WatchNetworkMonitor};
pub use sync::{
    AttemptOutcome, LifecycleEvent, StateProjection, SyncCoordinator, SyncState, SyncStatus,
};
