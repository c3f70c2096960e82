// Chart view - Served chart state plus a live update stream
use crate::application::chart_sink::{ChartSink, Notifier};
use crate::domain::display::{DisplayMode, DisplayRange};
use crate::domain::energy::EnergySummary;
use crate::domain::telemetry::CostSample;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Points retained for a realtime session; older ones scroll off the chart.
pub const MAX_STREAM_POINTS: usize = 300;
const MAX_NOTIFICATIONS: usize = 20;
const UPDATE_CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
    pub at_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSnapshot {
    pub mode: DisplayMode,
    pub enforced: bool,
    pub range: Option<DisplayRange>,
    pub points: Vec<CostSample>,
    pub summary: Option<EnergySummary>,
    pub error: Option<String>,
    pub notifications: Vec<Notification>,
}

/// Incremental update pushed to `/chart/stream` subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartUpdate {
    Mode {
        mode: DisplayMode,
        enforced: bool,
        range: Option<DisplayRange>,
    },
    Stream {
        points: Vec<CostSample>,
    },
    Point {
        point: CostSample,
    },
    Series {
        mode: DisplayMode,
        range: DisplayRange,
        points: Vec<CostSample>,
    },
    Summary {
        summary: EnergySummary,
    },
    Error {
        message: String,
    },
    Notice {
        notification: Notification,
    },
    Cleared,
}

struct ViewState {
    mode: DisplayMode,
    enforced: bool,
    range: Option<DisplayRange>,
    points: VecDeque<CostSample>,
    summary: Option<EnergySummary>,
    error: Option<String>,
    notifications: VecDeque<Notification>,
}

pub struct ChartView {
    state: Mutex<ViewState>,
    updates: broadcast::Sender<ChartUpdate>,
}

impl Default for ChartView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartView {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(ViewState {
                mode: DisplayMode::Realtime,
                enforced: false,
                range: None,
                points: VecDeque::new(),
                summary: None,
                error: None,
                notifications: VecDeque::new(),
            }),
            updates,
        }
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        let state = self.lock();
        ChartSnapshot {
            mode: state.mode,
            enforced: state.enforced,
            range: state.range,
            points: state.points.iter().copied().collect(),
            summary: state.summary.clone(),
            error: state.error.clone(),
            notifications: state.notifications.iter().cloned().collect(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChartUpdate> {
        self.updates.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn publish(&self, update: ChartUpdate) {
        // No subscribers is the normal case between page loads.
        let _ = self.updates.send(update);
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        let notification = Notification {
            level,
            message: message.to_string(),
            at_ms: chrono::Utc::now().timestamp_millis(),
        };
        {
            let mut state = self.lock();
            if state.notifications.len() == MAX_NOTIFICATIONS {
                state.notifications.pop_front();
            }
            state.notifications.push_back(notification.clone());
        }
        self.publish(ChartUpdate::Notice { notification });
    }
}

impl ChartSink for ChartView {
    fn mode_changed(&self, mode: DisplayMode, enforced: bool, range: Option<DisplayRange>) {
        {
            let mut state = self.lock();
            state.mode = mode;
            state.enforced = enforced;
            state.range = range;
            state.error = None;
        }
        self.publish(ChartUpdate::Mode { mode, enforced, range });
    }

    fn begin_stream(&self, seed: &[CostSample]) {
        {
            let mut state = self.lock();
            state.summary = None;
            state.points = seed.iter().rev().take(MAX_STREAM_POINTS).rev().copied().collect();
        }
        self.publish(ChartUpdate::Stream { points: seed.to_vec() });
    }

    fn push_point(&self, point: CostSample) {
        {
            let mut state = self.lock();
            if state.points.len() == MAX_STREAM_POINTS {
                state.points.pop_front();
            }
            state.points.push_back(point);
        }
        self.publish(ChartUpdate::Point { point });
    }

    fn show_series(&self, mode: DisplayMode, range: DisplayRange, series: Vec<CostSample>) {
        {
            let mut state = self.lock();
            state.error = None;
            state.points = series.iter().copied().collect();
        }
        self.publish(ChartUpdate::Series {
            mode,
            range,
            points: series,
        });
    }

    fn show_summary(&self, summary: EnergySummary) {
        self.lock().summary = Some(summary.clone());
        self.publish(ChartUpdate::Summary { summary });
    }

    fn show_error(&self, message: &str) {
        {
            let mut state = self.lock();
            state.points.clear();
            state.error = Some(message.to_string());
        }
        self.publish(ChartUpdate::Error {
            message: message.to_string(),
        });
    }

    fn clear(&self) {
        {
            let mut state = self.lock();
            state.points.clear();
            state.summary = None;
            state.error = None;
        }
        self.publish(ChartUpdate::Cleared);
    }
}

// Callers log with their own context; these only reach the user.
impl Notifier for ChartView {
    fn warn(&self, message: &str) {
        self.notify(NoticeLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NoticeLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_window_is_bounded() {
        let view = ChartView::new();
        view.begin_stream(&[CostSample::new(0, 0.01)]);
        for i in 1..=MAX_STREAM_POINTS as i64 + 10 {
            view.push_point(CostSample::new(i * 1000, 0.02));
        }

        let snapshot = view.snapshot();
        assert_eq!(snapshot.points.len(), MAX_STREAM_POINTS);
        assert_eq!(snapshot.points[0].x, 11_000);
    }

    #[test]
    fn test_series_replaces_and_error_clears() {
        let view = ChartView::new();
        let range = DisplayRange::new(0, 3_600_000).unwrap();
        view.mode_changed(DisplayMode::Today, false, Some(range));
        view.show_series(DisplayMode::Today, range, vec![CostSample::new(0, 0.1); 3]);
        assert_eq!(view.snapshot().points.len(), 3);

        view.show_error("backend down");
        let snapshot = view.snapshot();
        assert!(snapshot.points.is_empty());
        assert_eq!(snapshot.error.as_deref(), Some("backend down"));
        assert_eq!(snapshot.range, Some(range));

        view.mode_changed(DisplayMode::Realtime, true, None);
        assert_eq!(view.snapshot().error, None);
    }

    #[test]
    fn test_notifications_are_capped() {
        let view = ChartView::new();
        for i in 0..MAX_NOTIFICATIONS + 5 {
            view.warn(&format!("warning {i}"));
        }
        view.error("last");

        let notifications = view.snapshot().notifications;
        assert_eq!(notifications.len(), MAX_NOTIFICATIONS);
        assert_eq!(notifications.last().unwrap().level, NoticeLevel::Error);
        assert_eq!(notifications[0].message, "warning 6");
    }

    #[tokio::test]
    async fn test_each_notice_is_delivered_once() {
        let view = ChartView::new();
        let mut updates = view.subscribe();

        view.warn("realtime only");

        assert_eq!(view.snapshot().notifications.len(), 1);
        match updates.try_recv().unwrap() {
            ChartUpdate::Notice { notification } => {
                assert_eq!(notification.level, NoticeLevel::Warning);
                assert_eq!(notification.message, "realtime only");
            }
            other => panic!("unexpected update: {other:?}"),
        }
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribers_receive_updates() {
        let view = ChartView::new();
        let mut updates = view.subscribe();

        view.push_point(CostSample::new(5000, 0.03));
        view.clear();

        match updates.recv().await.unwrap() {
            ChartUpdate::Point { point } => assert_eq!(point.x, 5000),
            other => panic!("unexpected update: {other:?}"),
        }
        assert!(matches!(updates.recv().await.unwrap(), ChartUpdate::Cleared));

        let encoded = serde_json::to_value(ChartUpdate::Cleared).unwrap();
        assert_eq!(encoded["type"], "cleared");
    }
}
