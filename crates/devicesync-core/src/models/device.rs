use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Battery percentage below which a device is flagged as low.
const LOW_BATTERY_PERCENT: u8 = 20;

/// Reported health of a device.
///
/// Unknown status strings are kept verbatim so they survive a round trip
/// through the cache and can still be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceStatus {
    Online,
    Offline,
    Warning,
    Other(String),
}

impl DeviceStatus {
    /// Display label for this status.
    pub fn label(&self) -> &str {
        match self {
            DeviceStatus::Online => "Online",
            DeviceStatus::Offline => "Offline",
            DeviceStatus::Warning => "Warning",
            DeviceStatus::Other(raw) => raw,
        }
    }

    /// Hex color hint for status indicators.
    pub fn color(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "#22C55E",
            DeviceStatus::Offline => "#EF4444",
            DeviceStatus::Warning => "#F59E0B",
            DeviceStatus::Other(_) => "#999999",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Warning => "warning",
            DeviceStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for DeviceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "online" => DeviceStatus::Online,
            "offline" => DeviceStatus::Offline,
            "warning" => DeviceStatus::Warning,
            _ => DeviceStatus::Other(s),
        }
    }
}

impl From<DeviceStatus> for String {
    fn from(status: DeviceStatus) -> Self {
        match status {
            DeviceStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A device as reported by the remote source.
///
/// Value object: two devices are equal when every field is equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub status: DeviceStatus,
    /// Battery percentage, absent for mains-powered units
    #[serde(default, deserialize_with = "deserialize_battery")]
    pub battery: Option<u8>,
    #[serde(rename = "lastSeen")]
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Device {
    pub fn is_battery_low(&self) -> bool {
        self.battery.map(|b| b < LOW_BATTERY_PERCENT).unwrap_or(false)
    }

    pub fn location_display(&self) -> &str {
        match self.location.as_deref() {
            Some(loc) if !loc.is_empty() => loc,
            _ => "No location",
        }
    }

    /// How long ago the device was last observed, relative to `now`.
    pub fn last_seen_display(&self, now: DateTime<Utc>) -> String {
        let minutes = (now - self.last_seen).num_minutes();
        if minutes < 1 {
            "Just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            self.last_seen.format("%b %d, %Y").to_string()
        }
    }
}

/// Accept any integer (or null) and clamp it into 0..=100.
fn deserialize_battery<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<i64> = Option::deserialize(deserializer)?;
    Ok(raw.map(|level| level.clamp(0, 100) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_json(status: &str, battery: &str) -> String {
        format!(
            r#"{{"id":"dev_001","name":"Sensor Node 01","type":"temperature","status":"{}","battery":{},"lastSeen":"2026-02-17T14:30:00.000Z","location":"Zone A"}}"#,
            status, battery
        )
    }

    #[test]
    fn test_parse_device() {
        let device: Device = serde_json::from_str(&sample_json("online", "87"))
            .expect("Failed to parse device test JSON");
        assert_eq!(device.id, "dev_001");
        assert_eq!(device.device_type, "temperature");
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.battery, Some(87));
        assert_eq!(device.location.as_deref(), Some("Zone A"));
    }

    #[test]
    fn test_unknown_status_passes_through() {
        let device: Device = serde_json::from_str(&sample_json("maintenance", "null"))
            .expect("Failed to parse device test JSON");
        assert_eq!(device.status, DeviceStatus::Other("maintenance".to_string()));
        assert_eq!(device.status.label(), "maintenance");
        assert_eq!(device.status.color(), "#999999");

        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["status"], "maintenance");
    }

    #[test]
    fn test_battery_is_clamped() {
        let high: Device = serde_json::from_str(&sample_json("online", "140")).unwrap();
        assert_eq!(high.battery, Some(100));
        let low: Device = serde_json::from_str(&sample_json("online", "-4")).unwrap();
        assert_eq!(low.battery, Some(0));
        let mains: Device = serde_json::from_str(&sample_json("online", "null")).unwrap();
        assert_eq!(mains.battery, None);
        assert!(!mains.is_battery_low());
    }

    #[test]
    fn test_battery_low_threshold() {
        let mut device: Device = serde_json::from_str(&sample_json("warning", "19")).unwrap();
        assert!(device.is_battery_low());
        device.battery = Some(20);
        assert!(!device.is_battery_low());
    }

    #[test]
    fn test_last_seen_display() {
        let device: Device = serde_json::from_str(&sample_json("online", "50")).unwrap();
        let seen = device.last_seen;
        assert_eq!(device.last_seen_display(seen + Duration::seconds(30)), "Just now");
        assert_eq!(device.last_seen_display(seen + Duration::minutes(5)), "5m ago");
        assert_eq!(device.last_seen_display(seen + Duration::minutes(185)), "3h ago");
        assert_eq!(device.last_seen_display(seen + Duration::days(2)), "Feb 17, 2026");
    }

    #[test]
    fn test_location_display() {
        let mut device: Device = serde_json::from_str(&sample_json("online", "50")).unwrap();
        assert_eq!(device.location_display(), "Zone A");
        device.location = None;
        assert_eq!(device.location_display(), "No location");
    }
}
