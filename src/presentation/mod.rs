// Presentation layer - HTTP surface over the chart view
pub mod app_state;
pub mod chart_view;
pub mod handlers;
