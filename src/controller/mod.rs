// HTTP API controllers for the operator interface.

pub mod controller;
pub mod metrics;
pub mod response;
pub mod speed;
pub mod units;


// Re-export controller types for convenience
pub use metrics::PrometheusMetricsController;
pub use speed::SpeedController;
pub use units::UnitsController;
