// Application wiring: platform, governor, workers and the operator API.

pub mod app;
pub mod server;

pub use app::App;
pub use server::ApiServer;
