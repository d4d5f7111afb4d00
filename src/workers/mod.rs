// Background workers of the governor service.

pub mod limits;

// Re-export main types
pub use limits::LimitsWatcher;
