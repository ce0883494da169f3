//! Plain-text rendering of sync states and devices.

use std::time::Duration;

use chrono::{DateTime, Utc};

use devicesync_core::sync::status_banner;
use devicesync_core::utils::{format_age, truncate_string};
use devicesync_core::{Device, SyncState, SyncStatus};

const NAME_WIDTH: usize = 22;
const TYPE_WIDTH: usize = 12;
const LOCATION_WIDTH: usize = 14;

/// One line summarizing a published state.
pub fn state_line(state: &SyncState, now: DateTime<Utc>, staleness_bound: Duration) -> String {
    let mut line = format!("[{}] {} devices", state.status, state.devices.len());

    match state.last_synced_at {
        Some(at) => line.push_str(&format!(", synced {}", format_age((now - at).num_minutes()))),
        None => line.push_str(", never synced"),
    }
    if state.is_stale(now, staleness_bound) {
        line.push_str(" (stale)");
    }
    if let Some(ref error) = state.error {
        line.push_str(&format!(" - {}", error));
    }
    line
}

pub fn print_state(state: &SyncState, now: DateTime<Utc>, staleness_bound: Duration) {
    println!("{}", state_line(state, now, staleness_bound));
    if let Some(banner) = status_banner(state, now, staleness_bound) {
        println!("  {}", banner);
    }
    if state.status == SyncStatus::Synced {
        print_device_table(&state.devices, now);
    }
}

fn battery_cell(device: &Device) -> String {
    match device.battery {
        Some(level) if device.is_battery_low() => format!("{}% low", level),
        Some(level) => format!("{}%", level),
        None => "-".to_string(),
    }
}

/// Table rows for `devices`, header first. An empty list gets a single
/// "No devices found" line instead.
pub fn device_table(devices: &[Device], now: DateTime<Utc>) -> Vec<String> {
    if devices.is_empty() {
        return vec!["  No devices found".to_string()];
    }

    let mut lines = Vec::with_capacity(devices.len() + 1);
    lines.push(format!(
        "  {:<10} {:<NAME_WIDTH$} {:<TYPE_WIDTH$} {:<8} {:<8} {:<LOCATION_WIDTH$} LAST SEEN",
        "ID", "NAME", "TYPE", "STATUS", "BATTERY", "LOCATION"
    ));
    for device in devices {
        lines.push(format!(
            "  {:<10} {:<NAME_WIDTH$} {:<TYPE_WIDTH$} {:<8} {:<8} {:<LOCATION_WIDTH$} {}",
            truncate_string(&device.id, 10),
            truncate_string(&device.name, NAME_WIDTH),
            truncate_string(&device.device_type, TYPE_WIDTH),
            device.status.label(),
            battery_cell(device),
            truncate_string(device.location_display(), LOCATION_WIDTH),
            device.last_seen_display(now),
        ));
    }
    lines
}

pub fn print_device_table(devices: &[Device], now: DateTime<Utc>) {
    for line in device_table(devices, now) {
        println!("{}", line);
    }
}

pub fn print_device_detail(device: &Device, now: DateTime<Utc>) {
    println!("{} ({})", device.name, device.id);
    println!("  Type:      {}", device.device_type);
    println!("  Status:    {} ({})", device.status.label(), device.status.color());
    println!("  Battery:   {}", battery_cell(device));
    println!("  Location:  {}", device.location_display());
    println!("  Last seen: {}", device.last_seen_display(now));
}
