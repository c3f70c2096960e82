// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::{mpsc, watch};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chart_sink::{ChartSink, Notifier};
use crate::application::detail_service::DetailService;
use crate::application::energy_backend::EnergyBackend;
use crate::application::feed_adapter::FeedAdapter;
use crate::application::mode_controller::{ControllerParts, ModeController};
use crate::application::power_cache::{MemoryPowerCache, PowerCache};
use crate::application::runtime;
use crate::application::scheduler::{Clock, SystemClock};
use crate::domain::energy::SharedPrice;
use crate::domain::synthetic::SyntheticGenerator;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::file_power_cache::FilePowerCache;
use crate::infrastructure::http_backend::HttpEnergyBackend;
use crate::infrastructure::ws_feed::spawn_websocket_feed;
use crate::presentation::app_state::AppState;
use crate::presentation::chart_view::ChartView;
use crate::presentation::handlers::{
    get_chart, get_detail, health_check, reload_settings, select_mode, stream_chart,
};

const COMMAND_BUFFER: usize = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ups_energy_telemetry=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Adapters (infrastructure layer)
    let backend: Arc<dyn EnergyBackend> = Arc::new(HttpEnergyBackend::new(
        config.backend.base_url.clone(),
        Duration::from_secs(config.backend.timeout_secs),
    )?);
    let cache: Arc<dyn PowerCache> = match &config.cache.path {
        Some(path) => Arc::new(FilePowerCache::new(path)),
        None => Arc::new(MemoryPowerCache::new()),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (transport, feed_events) = spawn_websocket_feed(
        config.feed.url.clone(),
        Duration::from_millis(config.feed.reconnect_delay_ms),
    );

    // Services (application layer)
    let chart = Arc::new(ChartView::new());
    let sink: Arc<dyn ChartSink> = chart.clone();
    let notifier: Arc<dyn Notifier> = chart.clone();
    let price = SharedPrice::new(config.pricing.default_price_per_kwh);

    let feed = FeedAdapter::new(Box::new(transport), cache.clone(), clock.clone());
    let controller = ModeController::new(ControllerParts {
        backend: backend.clone(),
        feed,
        clock,
        chart: sink,
        notifier: notifier.clone(),
        cache: cache.clone(),
        generator: SyntheticGenerator::new(),
        price: price.clone(),
    });
    let details = DetailService::new(backend, cache, notifier, price, SyntheticGenerator::new());

    let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let engine = tokio::spawn(runtime::run(controller, feed_events, command_rx));

    let (shutdown_tx, shutdown) = watch::channel(false);
    let state = Arc::new(AppState {
        chart,
        commands,
        details,
        shutdown,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/chart", get(get_chart))
        .route("/chart/stream", get(stream_chart))
        .route("/mode", post(select_mode))
        .route("/settings/reload", post(reload_settings))
        .route("/detail", get(get_detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.listen))?;
    tracing::info!("Starting ups-energy-telemetry on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    // The router owned the last command sender, so the engine is winding down.
    engine.await.context("Dashboard engine panicked")?;

    Ok(())
}

/// Resolves on Ctrl-C, after telling open chart streams to finish.
async fn shutdown_signal(streams: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    let _ = streams.send(true);
}
