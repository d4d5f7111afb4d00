// Main governor application implementation.

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, ConfigTrait};
use crate::governor::{Governor, SetSpeed, UnitId};
use crate::platform::Platform;
use crate::shutdown::GracefulShutdown;
use crate::workers::LimitsWatcher;

use super::server::ApiServer;

/// Encapsulates the entire governor service: it plays the lifecycle framework
/// for the units it manages.
#[derive(Clone)]
pub struct App {
    cfg: Config,
    shutdown_token: CancellationToken,
    platform: Platform,
    governor: Arc<dyn Governor>,
    watcher: Option<Arc<LimitsWatcher>>,
    server: Arc<ApiServer>,
}

impl App {
    /// Creates the application and brings every configured unit under management.
    pub fn new(shutdown_token: CancellationToken, cfg: Config) -> Result<Self> {
        let platform = Platform::build(cfg.platform()).context("failed to build platform")?;
        let governor: Arc<dyn Governor> =
            Arc::new(SetSpeed::new(platform.policies(), platform.driver()));

        let watcher = cfg
            .limits()
            .filter(|limits| limits.enabled)
            .map(|limits| {
                LimitsWatcher::new(
                    shutdown_token.clone(),
                    governor.clone(),
                    platform.policies(),
                    limits.poll_interval(),
                )
            });

        let server = Arc::new(ApiServer::new(
            shutdown_token.clone(),
            cfg.clone(),
            governor.clone(),
            platform.policies(),
        )?);

        let app = Self {
            cfg,
            shutdown_token,
            platform,
            governor,
            watcher,
            server,
        };
        app.boot()?;
        Ok(app)
    }

    pub fn governor(&self) -> Arc<dyn Governor> {
        self.governor.clone()
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn watcher(&self) -> Option<Arc<LimitsWatcher>> {
        self.watcher.clone()
    }

    pub fn router(&self) -> Router {
        self.server.router()
    }

    /// Units to manage: the configured list or everything the platform reports.
    fn unit_ids(&self) -> Result<Vec<UnitId>> {
        match self.cfg.units() {
            Some(units) => Ok(units.to_vec()),
            None => self
                .platform
                .policies()
                .units()
                .context("failed to discover units"),
        }
    }

    /// Claims, attaches and starts every unit. A unit that fails is skipped.
    fn boot(&self) -> Result<()> {
        let units = self.unit_ids()?;
        let mut started = 0usize;

        for unit in &units {
            let unit = *unit;
            let result = self
                .platform
                .claim(unit)
                .and_then(|_| self.governor.attach(unit))
                .and_then(|_| {
                    self.governor.start(unit).map_err(|err| {
                        self.governor.detach(unit);
                        err
                    })
                });

            match result {
                Ok(()) => started += 1,
                Err(err) => warn!(
                    component = "app",
                    event = "unit_skipped",
                    unit = unit,
                    error = %err,
                    "unit could not be brought under management"
                ),
            }
        }

        info!(
            component = "app",
            event = "booted",
            governor = self.governor.name(),
            platform = self.platform.kind(),
            units = units.len(),
            managed = started,
            "units brought under management"
        );
        Ok(())
    }

    /// Starts the limits watcher and the API server in background tasks.
    pub async fn serve(&self, gsh: Arc<GracefulShutdown>) -> Result<()> {
        if let Some(watcher) = self.watcher.clone() {
            gsh.add(1);
            let gsh_watcher = gsh.clone();
            tokio::task::spawn(async move {
                watcher.run().await;
                gsh_watcher.done();
            });
        }

        gsh.add(1);
        let server = self.server.clone();
        let app_for_close = self.clone();
        let gsh_server = gsh.clone();
        tokio::task::spawn(async move {
            if let Err(e) = server.listen_and_serve().await {
                error!(
                    component = "app",
                    scope = "server",
                    event = "serve_failed",
                    error = %e,
                    "server failed to serve"
                );
            }

            app_for_close.close();
            gsh_server.done();
        });

        info!(component = "app", event = "started", "application lifecycle");
        Ok(())
    }

    /// Checks whether the API server is still listening.
    pub fn is_alive(&self) -> bool {
        self.server.is_alive()
    }

    /// Stops and detaches every unit and cancels the background tasks.
    pub fn close(&self) {
        for report in self.governor.units() {
            self.governor.stop(report.id);
            self.governor.detach(report.id);
        }

        self.shutdown_token.cancel();

        info!(component = "app", event = "stopped", "application lifecycle");
    }
}
