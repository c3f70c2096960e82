// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod file_power_cache;
pub mod http_backend;
pub mod ws_feed;
