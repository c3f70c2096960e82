// Energy analytics domain models
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Billing variables from the settings backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySettings {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_per_kwh: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub co2_factor: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub efficiency_factor: f64,
}

/// Aggregate returned by `/energy/data`. Older backends send camelCase keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergySummary {
    #[serde(default, alias = "totalEnergy", deserialize_with = "lenient_f64")]
    pub total_energy: f64,
    #[serde(default, alias = "totalCost", deserialize_with = "lenient_f64")]
    pub total_cost: f64,
    #[serde(default, alias = "avgLoad", deserialize_with = "lenient_f64")]
    pub avg_load: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub co2: f64,
    #[serde(default)]
    pub cost_distribution: serde_json::Value,
    #[serde(default)]
    pub trends: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailKind {
    /// Minute-of-hour drill-down.
    Hour,
    /// Hour-of-day drill-down.
    Day,
}

impl DetailKind {
    pub fn as_query_value(self) -> &'static str {
        match self {
            DetailKind::Hour => "hour",
            DetailKind::Day => "day",
        }
    }
}

/// Price per kWh shared between the controller and the drill-down service.
#[derive(Debug, Clone)]
pub struct SharedPrice(Arc<AtomicU64>);

impl SharedPrice {
    pub fn new(price_per_kwh: f64) -> Self {
        Self(Arc::new(AtomicU64::new(price_per_kwh.to_bits())))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, price_per_kwh: f64) {
        self.0.store(price_per_kwh.to_bits(), Ordering::Relaxed);
    }
}

/// Accept numbers, numeric strings and null (as 0).
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => Ok(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid number {s:?}: {e}"))),
        serde_json::Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!("expected number, got {other}"))),
    }
}
