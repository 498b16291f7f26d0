use chrono::Utc;
use rand::Rng;

use crate::model::{Metadata, TelemetryReading};

/// Battery percentage drained on every reading, independent of tick period.
pub const BATTERY_DRAIN: f64 = 0.35;
pub const BATTERY_FULL: f64 = 100.0;

const VARIANCE_MIN: f64 = 0.8;
const VARIANCE_MAX: f64 = 1.2;

/// Per-device signal state. Temperature and humidity jitter around fixed
/// baselines derived from the device ID; the battery drains linearly and
/// recharges to full once it would hit zero.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    device_id: u32,
    base_temperature: f64,
    base_humidity: f64,
    battery_level: f64,
}

impl SignalGenerator {
    pub fn new(device_id: u32) -> Self {
        let battery = rand::thread_rng().gen_range(0.0..BATTERY_FULL);
        Self::with_battery(device_id, battery)
    }

    /// Starts from a given battery level, clamped into `[0, 100]`.
    /// A level of zero recharges to full on the first reading.
    pub fn with_battery(device_id: u32, battery_level: f64) -> Self {
        let battery_level = if battery_level.is_nan() {
            BATTERY_FULL
        } else {
            battery_level.clamp(0.0, BATTERY_FULL)
        };

        Self {
            device_id,
            base_temperature: base_temperature(device_id),
            base_humidity: base_humidity(device_id),
            battery_level,
        }
    }

    pub fn base_temperature(&self) -> f64 {
        self.base_temperature
    }

    pub fn base_humidity(&self) -> f64 {
        self.base_humidity
    }

    pub fn battery_level(&self) -> f64 {
        self.battery_level
    }

    pub fn generate(&mut self) -> TelemetryReading {
        self.generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with(&mut self, rng: &mut impl Rng) -> TelemetryReading {
        let variance_t = rng.gen_range(VARIANCE_MIN..VARIANCE_MAX);
        let variance_h = rng.gen_range(VARIANCE_MIN..VARIANCE_MAX);

        let temperature = round1(self.base_temperature * variance_t);
        let humidity = round1(self.base_humidity * variance_h);

        self.battery_level -= BATTERY_DRAIN;
        if self.battery_level <= 0.0 {
            self.battery_level = BATTERY_FULL;
        }

        TelemetryReading {
            device_id: self.device_id,
            timestamp: Utc::now(),
            temperature,
            humidity,
            battery: round1(self.battery_level),
            metadata: Metadata::default(),
        }
    }
}

pub fn base_temperature(device_id: u32) -> f64 {
    20.0 + f64::from(device_id % 10)
}

pub fn base_humidity(device_id: u32) -> f64 {
    40.0 + f64::from(device_id % 15)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
