use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FIRMWARE_VERSION: &str = "1.0.4";
pub const STATUS_OK: &str = "ok";

/// One telemetry sample, in the shape the collector receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    pub device_id: u32,
    #[serde(rename = "ts", with = "millis_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub battery: f64,
    #[serde(rename = "payload")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub firmware: String,
    pub status: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            firmware: FIRMWARE_VERSION.to_string(),
            status: STATUS_OK.to_string(),
        }
    }
}

/// Health probe response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStatus {
    pub status: String,
    pub active_devices: usize,
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
mod millis_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
