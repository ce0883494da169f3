//! Local caching module for offline data access.
//!
//! This module provides the `CacheStore` for storing and retrieving the
//! device list locally. The whole list is one JSON snapshot under a single
//! key, tagged with a schema version; a snapshot written by an incompatible
//! build is treated as if it did not exist.
//!
//! Backends:
//! - `FileStore`: one JSON file per key in the cache directory
//! - `MemoryStore`: in-process, for tests and non-persistent sessions

pub mod manager;
pub mod store;

pub use manager::{CacheSnapshot, CacheStore, DEFAULT_CACHE_KEY, SCHEMA_VERSION};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
