// Domain layer - Telemetry types and display algorithms
pub mod display;
pub mod energy;
pub mod gap;
pub mod smoothing;
pub mod synthetic;
pub mod telemetry;
