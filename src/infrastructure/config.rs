use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub backend: BackendSettings,
    pub feed: FeedSettings,
    pub server: ServerSettings,
    pub cache: CacheSettings,
    pub pricing: PricingSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendSettings {
    /// Base of the REST API, e.g. `http://ups-host:5000/api`
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedSettings {
    pub url: String,
    pub reconnect_delay_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5000/ws/cache".to_string(),
            reconnect_delay_ms: 3000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8090".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CacheSettings {
    /// JSON file holding the last power reading. In-memory when unset.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PricingSettings {
    /// Used until `/settings/variables` answers with a positive price
    pub default_price_per_kwh: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            default_price_per_kwh: 0.25,
        }
    }
}

/// `config/dashboard.{toml,yaml,json}` if present, overridden by
/// `UPS_DASHBOARD__SECTION__KEY` environment variables.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("UPS_DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_defaults_without_sources() {
        let config: DashboardConfig = Config::builder().build().unwrap().try_deserialize().unwrap();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000/api");
        assert_eq!(config.feed.reconnect_delay_ms, 3000);
        assert_eq!(config.cache.path, None);
        assert_eq!(config.pricing.default_price_per_kwh, 0.25);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let toml = r#"
            [backend]
            base_url = "http://ups.lan/api"

            [cache]
            path = "/var/lib/ups/last_power.json"
        "#;
        let config: DashboardConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.backend.base_url, "http://ups.lan/api");
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.cache.path.as_deref(), Some("/var/lib/ups/last_power.json"));
        assert_eq!(config.server.listen, "0.0.0.0:8090");
    }
}
