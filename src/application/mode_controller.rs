// Mode controller - Chooses between the live stream and historical aggregates
use crate::application::chart_sink::{ChartSink, Notifier};
use crate::application::energy_backend::{EnergyBackend, HistoryQuery};
use crate::application::feed_adapter::{FeedAdapter, TransportEvent};
use crate::application::power_cache::PowerCache;
use crate::application::scheduler::{Clock, Scheduler, TimerHandle, TimerKind};
use crate::domain::display::{DisplayMode, DisplayRange, EnforcementState, ModeError, ModeRequest};
use crate::domain::energy::{EnergySummary, SharedPrice};
use crate::domain::gap;
use crate::domain::smoothing::SmoothingBuffer;
use crate::domain::synthetic::SyntheticGenerator;
use crate::domain::telemetry::{CostSample, Reading};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const REFRESH_INTERVAL_MS: i64 = 1000;
pub const RECHECK_INTERVAL_MS: i64 = 60 * 1000;

/// Result of a request the controller spawned, delivered back through
/// [`ModeController::next_completion`].
#[derive(Debug)]
pub enum Completion {
    Sufficiency { generation: u64, result: anyhow::Result<bool> },
    Trend { epoch: u64, result: anyhow::Result<Vec<CostSample>> },
    Summary { epoch: u64, result: anyhow::Result<EnergySummary> },
}

/// Collaborators injected into the controller.
pub struct ControllerParts {
    pub backend: Arc<dyn EnergyBackend>,
    pub feed: FeedAdapter,
    pub clock: Arc<dyn Clock>,
    pub chart: Arc<dyn ChartSink>,
    pub notifier: Arc<dyn Notifier>,
    pub cache: Arc<dyn PowerCache>,
    pub generator: SyntheticGenerator,
    pub price: SharedPrice,
}

struct RealtimeSession {
    buffer: SmoothingBuffer,
    refresh: TimerHandle,
}

pub struct ModeController {
    backend: Arc<dyn EnergyBackend>,
    feed: FeedAdapter,
    scheduler: Scheduler,
    chart: Arc<dyn ChartSink>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<dyn PowerCache>,
    generator: SyntheticGenerator,
    price: SharedPrice,
    mode: DisplayMode,
    range: Option<DisplayRange>,
    enforcement: EnforcementState,
    recheck: Option<TimerHandle>,
    recheck_in_flight: bool,
    realtime: Option<RealtimeSession>,
    // Bumped on every mode entry; responses tagged with an older epoch are dropped
    epoch: u64,
    // Bumped whenever enforcement starts or ends
    enforcement_generation: u64,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ModeController {
    pub fn new(parts: ControllerParts) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            backend: parts.backend,
            feed: parts.feed,
            scheduler: Scheduler::new(parts.clock),
            chart: parts.chart,
            notifier: parts.notifier,
            cache: parts.cache,
            generator: parts.generator,
            price: parts.price,
            mode: DisplayMode::Realtime,
            range: None,
            enforcement: EnforcementState::default(),
            recheck: None,
            recheck_in_flight: false,
            realtime: None,
            epoch: 0,
            enforcement_generation: 0,
            completions_tx,
            completions_rx,
        }
    }

    /// Pick the initial mode from the history sufficiency check.
    pub async fn start(&mut self) {
        self.load_settings().await;

        match self.backend.has_hour_data().await {
            Ok(true) => {
                tracing::info!("Hourly history available, starting in today view");
                let range = DisplayRange::today(self.now());
                self.enter_historical(DisplayMode::Today, range);
            }
            Ok(false) => {
                tracing::info!("Less than one hour of history, enforcing realtime view");
                self.enter_realtime(true);
            }
            Err(e) => {
                tracing::warn!(
                    "History sufficiency check failed, enforcing realtime view: {:#}",
                    e
                );
                self.enter_realtime(true);
            }
        }
    }

    pub async fn load_settings(&self) {
        match self.backend.settings().await {
            Ok(settings) if settings.price_per_kwh > 0.0 => {
                tracing::info!(
                    "Energy price {} {}/kWh",
                    settings.price_per_kwh,
                    settings.currency.as_deref().unwrap_or("")
                );
                self.price.set(settings.price_per_kwh);
            }
            Ok(settings) => {
                tracing::warn!(
                    "Ignoring non-positive price_per_kwh {}, keeping {}",
                    settings.price_per_kwh,
                    self.price.get()
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load energy settings, keeping price {}: {:#}",
                    self.price.get(),
                    e
                );
            }
        }
    }

    /// Apply a user mode selection.
    pub fn select(&mut self, request: ModeRequest) -> Result<(), ModeError> {
        if request.mode().is_historical() && self.enforcement.enforced {
            tracing::warn!("Rejected {:?} view while realtime is enforced", request.mode());
            self.notifier
                .warn("Historical views become available once one hour of data has been recorded");
            return Err(ModeError::RealtimeEnforced);
        }

        match request.resolve_range(self.now())? {
            Some(range) => self.enter_historical(request.mode(), range),
            None => {
                // Manual realtime is never an enforcement state
                self.end_enforcement();
                self.enter_realtime(false);
            }
        }
        Ok(())
    }

    pub fn on_transport_event(&mut self, event: TransportEvent) {
        if let Some(reading) = self.feed.handle(event) {
            self.ingest(reading);
        }
    }

    /// Run every timer that is due at the current clock time.
    pub fn fire_due_timers(&mut self) {
        for (handle, kind) in self.scheduler.take_due() {
            if !self.scheduler.is_active(handle) {
                continue;
            }
            match kind {
                TimerKind::ChartRefresh => self.refresh_chart(),
                TimerKind::EnforcementRecheck => self.spawn_recheck(),
            }
        }
    }

    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions_rx.recv().await
    }

    pub fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Sufficiency { generation, result } => {
                self.apply_recheck(generation, result)
            }
            Completion::Trend { epoch, result } => {
                if !self.is_current(epoch, "cost trend") {
                    return;
                }
                match (result, self.range) {
                    (Ok(series), Some(range)) => {
                        tracing::debug!(
                            "Rendering {} historical points for {:?}",
                            series.len(),
                            self.mode
                        );
                        self.chart.show_series(self.mode, range, series);
                    }
                    (Ok(_), None) => {}
                    (Err(e), _) => {
                        tracing::error!("Failed to load {:?} energy history: {:#}", self.mode, e);
                        self.notifier.error(&format!("Failed to load energy history: {e}"));
                        self.chart.show_error("Energy history unavailable");
                    }
                }
            }
            Completion::Summary { epoch, result } => {
                if !self.is_current(epoch, "energy summary") {
                    return;
                }
                match result {
                    Ok(summary) => self.chart.show_summary(summary),
                    Err(e) => tracing::warn!("Failed to load energy summary: {:#}", e),
                }
            }
        }
    }

    /// Cancel every timer and subscription. In-flight responses are dropped.
    pub fn shutdown(&mut self) {
        self.teardown_session();
        if let Some(handle) = self.recheck.take() {
            self.scheduler.detach(handle);
        }
        self.scheduler.detach_all();
        self.epoch += 1;
        tracing::info!("Mode controller stopped");
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn range(&self) -> Option<DisplayRange> {
        self.range
    }

    pub fn enforcement(&self) -> EnforcementState {
        self.enforcement
    }

    pub fn is_enforced(&self) -> bool {
        self.enforcement.enforced
    }

    pub fn buffer(&self) -> Option<&SmoothingBuffer> {
        self.realtime.as_ref().map(|session| &session.buffer)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn feed(&self) -> &FeedAdapter {
        &self.feed
    }

    pub fn next_deadline(&self) -> Option<i64> {
        self.scheduler.next_deadline()
    }

    pub fn now(&self) -> i64 {
        self.scheduler.now_ms()
    }

    fn enter_realtime(&mut self, enforce: bool) {
        self.teardown_session();
        self.epoch += 1;

        let now = self.now();
        let seed = self.generator.seed_buffer(now, self.cache.load(), self.price.get());
        self.chart.clear();
        self.chart.begin_stream(&seed);

        let refresh = self.scheduler.attach(TimerKind::ChartRefresh, REFRESH_INTERVAL_MS);
        self.realtime = Some(RealtimeSession {
            buffer: SmoothingBuffer::seeded(&seed),
            refresh,
        });
        self.feed.attach();

        if enforce && !self.enforcement.enforced {
            self.enforcement.begin(now);
            self.enforcement_generation += 1;
            let recheck = self
                .scheduler
                .attach(TimerKind::EnforcementRecheck, RECHECK_INTERVAL_MS);
            self.recheck = Some(recheck);
        }

        self.mode = DisplayMode::Realtime;
        self.range = None;
        self.chart.mode_changed(self.mode, self.enforcement.enforced, None);
        tracing::info!("Entered realtime view (enforced: {})", self.enforcement.enforced);
    }

    fn enter_historical(&mut self, mode: DisplayMode, range: DisplayRange) {
        self.teardown_session();
        self.epoch += 1;

        self.mode = mode;
        self.range = Some(range);
        self.chart.clear();
        self.chart.mode_changed(mode, self.enforcement.enforced, Some(range));
        tracing::info!("Entered {:?} view for {}..{}", mode, range.from_ms, range.to_ms);

        self.spawn_history_fetch(HistoryQuery { mode, range });
    }

    /// Detach the realtime buffer, refresh timer and feed, if any.
    fn teardown_session(&mut self) {
        if let Some(session) = self.realtime.take() {
            self.scheduler.detach(session.refresh);
        }
        self.feed.detach();
    }

    fn end_enforcement(&mut self) {
        if self.enforcement.enforced {
            tracing::info!("Realtime enforcement lifted");
        }
        self.enforcement.clear();
        self.enforcement_generation += 1;
        self.recheck_in_flight = false;
        if let Some(handle) = self.recheck.take() {
            self.scheduler.detach(handle);
        }
    }

    fn ingest(&mut self, reading: Reading) {
        let price = self.price.get();
        let Some(session) = self.realtime.as_mut() else {
            return;
        };

        let sample = CostSample::from_reading(&reading, price);
        let filled = gap::append_with_fill(&mut session.buffer, sample);
        if filled > 0 {
            tracing::debug!(
                "Filled {} samples of feed silence before {}",
                filled,
                reading.timestamp
            );
        }
    }

    fn refresh_chart(&self) {
        if let Some(session) = &self.realtime {
            let point = CostSample::new(self.now(), session.buffer.estimate());
            self.chart.push_point(point);
        }
    }

    fn spawn_history_fetch(&self, query: HistoryQuery) {
        let epoch = self.epoch;

        let backend = self.backend.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = backend.cost_trend(&query).await;
            let _ = tx.send(Completion::Trend { epoch, result });
        });

        let backend = self.backend.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = backend.energy_summary(&query).await;
            let _ = tx.send(Completion::Summary { epoch, result });
        });
    }

    fn spawn_recheck(&mut self) {
        if !self.enforcement.enforced || self.recheck_in_flight {
            return;
        }
        self.recheck_in_flight = true;

        let generation = self.enforcement_generation;
        let backend = self.backend.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = backend.has_hour_data().await;
            let _ = tx.send(Completion::Sufficiency { generation, result });
        });
    }

    fn apply_recheck(&mut self, generation: u64, result: anyhow::Result<bool>) {
        if generation != self.enforcement_generation || !self.enforcement.enforced {
            tracing::debug!("Discarding stale history re-check");
            return;
        }
        self.recheck_in_flight = false;

        let now = self.now();
        match result {
            Ok(true) => {
                self.end_enforcement();
                if self.mode == DisplayMode::Realtime {
                    self.enter_historical(DisplayMode::Today, DisplayRange::today(now));
                }
            }
            Ok(false) if self.enforcement.window_elapsed(now) => {
                tracing::info!(
                    "Enforcement window elapsed without an hour of history, staying in realtime"
                );
            }
            Ok(false) => tracing::debug!("History still insufficient"),
            Err(e) => tracing::warn!("History re-check failed: {:#}", e),
        }
    }

    fn is_current(&self, epoch: u64, what: &str) -> bool {
        if epoch == self.epoch {
            return true;
        }
        tracing::debug!("Discarding stale {} response (epoch {} != {})", what, epoch, self.epoch);
        false
    }
}
