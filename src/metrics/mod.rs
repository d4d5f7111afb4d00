//! Prometheus metrics functionality.
//
//! Metrics organization:
//! - Governor counters: meter (dispatches, rejected explicit sets, limit events)
//! - Exporter and `/metrics` endpoint: controller::metrics

pub mod meter;

// Re-export commonly used items
pub use meter::*;
