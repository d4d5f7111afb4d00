// Integration test harness: an App booted on the simulated platform.

use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::config::{self, Config};
use crate::platform::{Platform, SimPlatform};

/// A booted application plus handles to the pieces tests poke at.
pub struct TestApp {
    pub app: App,
    pub sim: Arc<SimPlatform>,
    pub router: Router,
    pub shutdown_token: CancellationToken,
}

impl TestApp {
    /// Boots the application from the shared test config.
    pub fn start() -> Self {
        Self::start_with(config::new_test_config())
    }

    /// Boots the application from a caller-tweaked config.
    pub fn start_with(cfg: Config) -> Self {
        let shutdown_token = CancellationToken::new();
        let app = App::new(shutdown_token.clone(), cfg).expect("app boots");
        let sim = match app.platform() {
            Platform::Sim(sim) => sim.clone(),
            Platform::Sysfs { .. } => panic!("test config must use the sim platform"),
        };
        let router = app.router();

        Self {
            app,
            sim,
            router,
            shutdown_token,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
