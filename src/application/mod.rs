// Application layer - Use cases and the seams to external collaborators
pub mod chart_sink;
pub mod detail_service;
pub mod energy_backend;
pub mod feed_adapter;
pub mod mode_controller;
pub mod power_cache;
pub mod runtime;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;
