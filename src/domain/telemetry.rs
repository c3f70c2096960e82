// Telemetry data domain models
use serde::{Deserialize, Serialize};

/// One normalized power reading from the UPS feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub timestamp: i64,
    pub power_watts: f64,
    pub load_percent: f64,
}

impl Reading {
    pub fn new(timestamp: i64, power_watts: f64, load_percent: f64) -> Self {
        Self {
            timestamp,
            power_watts: power_watts.max(0.0),
            load_percent: load_percent.clamp(0.0, 100.0),
        }
    }
}

/// Chartable cost point. Serializes as `{ "x": ms, "y": cost }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostSample {
    pub x: i64,
    pub y: f64,
}

impl CostSample {
    pub fn new(x: i64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_reading(reading: &Reading, price_per_kwh: f64) -> Self {
        Self::new(reading.timestamp, energy_cost(reading.power_watts, price_per_kwh))
    }
}

/// Hourly cost of drawing `power_watts` at `price_per_kwh`.
pub fn energy_cost(power_watts: f64, price_per_kwh: f64) -> f64 {
    (power_watts / 1000.0) * price_per_kwh
}
