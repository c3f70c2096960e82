// Chart presentation boundary
use crate::domain::display::{DisplayMode, DisplayRange};
use crate::domain::energy::EnergySummary;
use crate::domain::telemetry::CostSample;

/// Rendering surface fed by the mode controller.
pub trait ChartSink: Send + Sync {
    fn mode_changed(&self, mode: DisplayMode, enforced: bool, range: Option<DisplayRange>);

    /// A realtime session started; `seed` is the pre-populated window.
    fn begin_stream(&self, seed: &[CostSample]);

    fn push_point(&self, point: CostSample);

    /// Replace the chart contents with a historical aggregate.
    fn show_series(&self, mode: DisplayMode, range: DisplayRange, series: Vec<CostSample>);

    fn show_summary(&self, summary: EnergySummary);

    fn show_error(&self, message: &str);

    fn clear(&self);
}

/// User-visible notifications.
pub trait Notifier: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}
