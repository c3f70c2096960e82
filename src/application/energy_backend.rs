// Backend trait for energy history and billing settings
use crate::domain::display::{DisplayMode, DisplayRange};
use crate::domain::energy::{DetailKind, EnergySettings, EnergySummary};
use crate::domain::telemetry::CostSample;
use async_trait::async_trait;

/// Parameters of a historical aggregate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub mode: DisplayMode,
    pub range: DisplayRange,
}

#[async_trait]
pub trait EnergyBackend: Send + Sync {
    /// Whether at least one hour of contiguous samples exists
    async fn has_hour_data(&self) -> anyhow::Result<bool>;

    /// Totals for the selected window
    async fn energy_summary(&self, query: &HistoryQuery) -> anyhow::Result<EnergySummary>;

    /// Aggregated cost series for the chart
    async fn cost_trend(&self, query: &HistoryQuery) -> anyhow::Result<Vec<CostSample>>;

    /// Drill-down series (per minute or per hour)
    async fn detailed(
        &self,
        range: &DisplayRange,
        kind: DetailKind,
    ) -> anyhow::Result<Vec<CostSample>>;

    async fn settings(&self) -> anyhow::Result<EnergySettings>;
}
