// Last-known power value, shared between the feed and the synthetic generator
use std::sync::Mutex;

pub trait PowerCache: Send + Sync {
    fn load(&self) -> Option<f64>;

    /// Failures are logged by the implementation, never propagated.
    fn store(&self, power_watts: f64);
}

/// Process-local cache, used when no cache file is configured.
#[derive(Debug, Default)]
pub struct MemoryPowerCache {
    value: Mutex<Option<f64>>,
}

impl MemoryPowerCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PowerCache for MemoryPowerCache {
    fn load(&self) -> Option<f64> {
        self.value.lock().ok().and_then(|guard| *guard)
    }

    fn store(&self, power_watts: f64) {
        if let Ok(mut guard) = self.value.lock() {
            *guard = Some(power_watts);
        }
    }
}
