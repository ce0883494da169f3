//! Remote data sources for the device list.
//!
//! This module provides the `RemoteDataSource` trait the sync engine pulls
//! from, plus two implementations:
//!
//! - `HttpDeviceSource`: REST backend, bearer token optional
//! - `MockDeviceSource`: simulated backend with configurable delay and failures

pub mod client;
pub mod error;
pub mod mock;
pub mod source;

pub use client::{HttpDeviceSource, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::{ApiError, FetchError};
pub use mock::MockDeviceSource;
pub use source::RemoteDataSource;
