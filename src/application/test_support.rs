// In-memory fakes for the application seams
use crate::application::chart_sink::{ChartSink, Notifier};
use crate::application::energy_backend::{EnergyBackend, HistoryQuery};
use crate::application::feed_adapter::{FeedError, FeedTransport};
use crate::domain::display::{DisplayMode, DisplayRange};
use crate::domain::energy::{DetailKind, EnergySettings, EnergySummary};
use crate::domain::telemetry::CostSample;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    requests: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn snapshot_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl FeedTransport for RecordingTransport {
    fn request_snapshot(&self) -> Result<(), FeedError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedError::Transport("closed".to_string()));
        }
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    pub has_data: AtomicBool,
    pub fail_check: AtomicBool,
    pub fail_history: AtomicBool,
    pub fail_detail: AtomicBool,
    pub price: Mutex<Option<f64>>,
    pub detail: Mutex<Vec<CostSample>>,
    pub history_queries: Mutex<Vec<HistoryQuery>>,
    pub checks: AtomicUsize,
}

impl ScriptedBackend {
    pub fn with_history(has_data: bool) -> Arc<Self> {
        let backend = Self::default();
        backend.has_data.store(has_data, Ordering::SeqCst);
        *backend.price.lock().unwrap() = Some(0.25);
        Arc::new(backend)
    }
}

#[async_trait]
impl EnergyBackend for ScriptedBackend {
    async fn has_hour_data(&self) -> anyhow::Result<bool> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.fail_check.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        Ok(self.has_data.load(Ordering::SeqCst))
    }

    async fn energy_summary(&self, _query: &HistoryQuery) -> anyhow::Result<EnergySummary> {
        if self.fail_history.load(Ordering::SeqCst) {
            anyhow::bail!("summary unavailable");
        }
        Ok(EnergySummary {
            total_cost: 1.25,
            ..Default::default()
        })
    }

    async fn cost_trend(&self, query: &HistoryQuery) -> anyhow::Result<Vec<CostSample>> {
        self.history_queries.lock().unwrap().push(*query);
        if self.fail_history.load(Ordering::SeqCst) {
            anyhow::bail!("trend unavailable");
        }
        Ok(vec![
            CostSample::new(query.range.from_ms, 0.1),
            CostSample::new(query.range.to_ms, 0.2),
        ])
    }

    async fn detailed(
        &self,
        _range: &DisplayRange,
        _kind: DetailKind,
    ) -> anyhow::Result<Vec<CostSample>> {
        if self.fail_detail.load(Ordering::SeqCst) {
            anyhow::bail!("detail unavailable");
        }
        Ok(self.detail.lock().unwrap().clone())
    }

    async fn settings(&self) -> anyhow::Result<EnergySettings> {
        match *self.price.lock().unwrap() {
            Some(price) => Ok(EnergySettings {
                currency: Some("EUR".to_string()),
                price_per_kwh: price,
                co2_factor: 0.4,
                efficiency_factor: 1.0,
            }),
            None => anyhow::bail!("settings unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    Mode(DisplayMode, bool),
    Stream(usize),
    Point(CostSample),
    Series(DisplayMode, DisplayRange, usize),
    Summary,
    Error(String),
    Clear,
}

#[derive(Debug, Default)]
pub struct RecordingChart {
    events: Mutex<Vec<ChartEvent>>,
}

impl RecordingChart {
    pub fn events(&self) -> Vec<ChartEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn series(&self) -> Vec<(DisplayMode, DisplayRange)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChartEvent::Series(mode, range, _) => Some((mode, range)),
                _ => None,
            })
            .collect()
    }

    pub fn points(&self) -> Vec<CostSample> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChartEvent::Point(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ChartEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ChartSink for RecordingChart {
    fn mode_changed(&self, mode: DisplayMode, enforced: bool, _range: Option<DisplayRange>) {
        self.record(ChartEvent::Mode(mode, enforced));
    }

    fn begin_stream(&self, seed: &[CostSample]) {
        self.record(ChartEvent::Stream(seed.len()));
    }

    fn push_point(&self, point: CostSample) {
        self.record(ChartEvent::Point(point));
    }

    fn show_series(&self, mode: DisplayMode, range: DisplayRange, series: Vec<CostSample>) {
        self.record(ChartEvent::Series(mode, range, series.len()));
    }

    fn show_summary(&self, _summary: EnergySummary) {
        self.record(ChartEvent::Summary);
    }

    fn show_error(&self, message: &str) {
        self.record(ChartEvent::Error(message.to_string()));
    }

    fn clear(&self) {
        self.record(ChartEvent::Clear);
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub warnings: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}
