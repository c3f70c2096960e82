// REST backend implementation
use crate::application::energy_backend::{EnergyBackend, HistoryQuery};
use crate::domain::display::DisplayRange;
use crate::domain::energy::{DetailKind, EnergySettings, EnergySummary};
use crate::domain::telemetry::CostSample;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpEnergyBackend {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct HasDataResponse {
    #[serde(default)]
    has_data: bool,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    series: Vec<CostSample>,
    #[serde(default)]
    message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl HttpEnergyBackend {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_url(&self, path: &str, params: &[(&str, String)]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();

        if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query.join("&"))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = self.build_url(path, params);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} failed with status {}: {}", path, status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {path} response"))
    }

    async fn get_series(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<CostSample>> {
        let response: SeriesResponse = self.get_json(path, params).await?;
        if !response.success {
            anyhow::bail!(
                "{} reported failure: {}",
                path,
                response.message.unwrap_or_else(|| "no message".to_string())
            );
        }
        Ok(response.series)
    }

    fn range_params(range: &DisplayRange) -> Vec<(&'static str, String)> {
        vec![
            ("from_time", format_time(range.from_ms)),
            ("to_time", format_time(range.to_ms)),
        ]
    }

    fn history_params(query: &HistoryQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![("type", query.mode.as_query_type().to_string())];
        params.extend(Self::range_params(&query.range));
        params
    }
}

/// RFC 3339 UTC with millisecond precision.
fn format_time(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ms.to_string())
}

/// Some endpoints wrap their body in `{ "success": .., "data": {..} }`.
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    }
}

#[async_trait]
impl EnergyBackend for HttpEnergyBackend {
    async fn has_hour_data(&self) -> Result<bool> {
        let response: HasDataResponse = self.get_json("/energy/has-hour-data", &[]).await?;
        Ok(response.has_data)
    }

    async fn energy_summary(&self, query: &HistoryQuery) -> Result<EnergySummary> {
        let value: Value = self.get_json("/energy/data", &Self::history_params(query)).await?;
        serde_json::from_value(unwrap_data(value)).context("Unexpected /energy/data body")
    }

    async fn cost_trend(&self, query: &HistoryQuery) -> Result<Vec<CostSample>> {
        self.get_series("/energy/cost-trend", &Self::history_params(query)).await
    }

    async fn detailed(&self, range: &DisplayRange, kind: DetailKind) -> Result<Vec<CostSample>> {
        let mut params = Self::range_params(range);
        params.push(("detail_type", kind.as_query_value().to_string()));
        self.get_series("/energy/detailed", &params).await
    }

    async fn settings(&self) -> Result<EnergySettings> {
        let value: Value = self.get_json("/settings/variables", &[]).await?;
        serde_json::from_value(unwrap_data(value)).context("Unexpected /settings/variables body")
    }
}
