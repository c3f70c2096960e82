// File-backed power cache - Survives restarts of the dashboard
use crate::application::power_cache::PowerCache;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct CachedPower {
    power_watts: f64,
    updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct FilePowerCache {
    path: PathBuf,
}

impl FilePowerCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn write(&self, power_watts: f64) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let entry = CachedPower {
            power_watts,
            updated_at: chrono::Utc::now().timestamp_millis(),
        };
        fs::write(&self.path, serde_json::to_vec(&entry)?)?;
        Ok(())
    }
}

impl PowerCache for FilePowerCache {
    fn load(&self) -> Option<f64> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<CachedPower>(&raw) {
            Ok(entry) if entry.power_watts.is_finite() => Some(entry.power_watts),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring unreadable power cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn store(&self, power_watts: f64) {
        if let Err(e) = self.write(power_watts) {
            tracing::warn!("Failed to persist power cache {}: {:#}", self.path.display(), e);
        }
    }
}
