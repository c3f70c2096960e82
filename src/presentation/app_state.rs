// Application state for HTTP handlers
use crate::application::detail_service::DetailService;
use crate::application::runtime::Command;
use crate::presentation::chart_view::ChartView;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    pub chart: Arc<ChartView>,
    /// Requests for the event loop that owns the mode controller.
    pub commands: mpsc::Sender<Command>,
    pub details: DetailService,
    /// Flips to `true` once the server starts shutting down; ends SSE streams.
    pub shutdown: watch::Receiver<bool>,
}
