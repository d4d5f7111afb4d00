// HTTP server wiring for the governor service.

use anyhow::Result;
use axum::Router;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::governor::{Governor, Policies};
use crate::http::{Controller, HttpServer, Server as HttpServerTrait};

/// Operator API server that wraps all dependencies.
pub struct ApiServer {
    server: Arc<HttpServer>,
    is_server_alive: Arc<AtomicBool>,
}

impl ApiServer {
    /// Creates a new ApiServer with every controller mounted.
    pub fn new(
        ctx: CancellationToken,
        cfg: Config,
        governor: Arc<dyn Governor>,
        policies: Arc<dyn Policies>,
    ) -> Result<Self> {
        let controllers = Self::controllers(governor, policies);
        let server = HttpServer::new(ctx, cfg, controllers)?;

        Ok(Self {
            server,
            is_server_alive: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns true while the server is listening.
    pub fn is_alive(&self) -> bool {
        self.is_server_alive.load(Ordering::Relaxed)
    }

    pub fn router(&self) -> Router {
        self.server.router()
    }

    /// Starts the HTTP server and serves until shutdown.
    pub async fn listen_and_serve(&self) -> Result<()> {
        self.is_server_alive.store(true, Ordering::Relaxed);
        let result = HttpServerTrait::listen_and_serve(self.server.as_ref()).await;
        self.is_server_alive.store(false, Ordering::Relaxed);
        result
    }

    /// Returns all HTTP controllers for the server.
    fn controllers(
        governor: Arc<dyn Governor>,
        policies: Arc<dyn Policies>,
    ) -> Vec<Box<dyn Controller>> {
        use crate::controller;

        vec![
            // Metrics endpoint
            Box::new(controller::PrometheusMetricsController::new()),
            // Reads current frequency and sets the target of a unit
            Box::new(controller::SpeedController::new(governor.clone())),
            // Lists units and switches management on/off
            Box::new(controller::UnitsController::new(governor, policies)),
        ]
    }
}
