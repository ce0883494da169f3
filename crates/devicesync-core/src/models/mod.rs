//! Data models for devices.
//!
//! - `Device`: one entry of the device list, as reported by the remote
//! - `DeviceStatus`: reported health, with pass-through for unknown values

pub mod device;

pub use device::{Device, DeviceStatus};
