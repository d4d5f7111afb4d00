//! HTTP server implementation.
//

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Config, ConfigTrait};
use crate::controller::controller::Controller;

const DEFAULT_NAME: &str = "hatsune";
const DEFAULT_PORT: &str = "8040";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Server trait for HTTP server operations.
#[async_trait::async_trait]
pub trait Server: Send + Sync {
    /// Starts the server (blocking).
    async fn listen_and_serve(&self) -> Result<()>;
}

/// HTTP server implementation.
pub struct HttpServer {
    shutdown_token: CancellationToken,
    config: Config,
    router: Router,
}

impl HttpServer {
    /// Creates a new HTTP server.
    pub fn new(
        shutdown_token: CancellationToken,
        config: Config,
        controllers: Vec<Box<dyn Controller>>,
    ) -> Result<Arc<Self>> {
        let router = Self::build_router(controllers);

        Ok(Arc::new(Self {
            shutdown_token,
            config,
            router,
        }))
    }

    /// Router with every controller mounted, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Resolves the listen address from the `api` section.
    pub fn addr(&self) -> Result<SocketAddr> {
        let port = self
            .config
            .api()
            .and_then(|api| api.port.as_deref())
            .unwrap_or(DEFAULT_PORT);
        let port = port.trim_start_matches(':');

        format!("0.0.0.0:{}", port)
            .parse()
            .context("Failed to parse server address")
    }

    /// Starts the HTTP server (async version).
    pub async fn listen_and_serve(&self) -> Result<()> {
        let name = self
            .config
            .api()
            .and_then(|api| api.name.as_deref())
            .unwrap_or(DEFAULT_NAME);
        let addr = self.addr()?;

        let listener = TcpListener::bind(&addr)
            .await
            .context("Failed to bind TCP listener")?;

        info!(
            component = "server",
            event = "started",
            name = name,
            addr = %addr,
            "server started"
        );

        let shutdown_token = self.shutdown_token.clone();
        let serve_future =
            axum::serve(listener, self.router.clone()).with_graceful_shutdown(async move {
                shutdown_token.cancelled().await;
            });

        if let Err(e) = serve_future.await {
            error!(
                component = "server",
                event = "listen_and_serve_failed",
                name = name,
                addr = %addr,
                error = %e,
                "server failed to listen and serve"
            );
            return Err(e.into());
        }

        info!(
            component = "server",
            event = "stopped",
            name = name,
            addr = %addr,
            "server stopped"
        );

        Ok(())
    }

    /// Builds the router with all controllers, request tracing and a timeout.
    fn build_router(controllers: Vec<Box<dyn Controller>>) -> Router {
        let mut router = Router::new();

        for controller in controllers {
            router = controller.add_route(router);
        }

        router
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
    }
}

#[async_trait::async_trait]
impl Server for HttpServer {
    async fn listen_and_serve(&self) -> Result<()> {
        HttpServer::listen_and_serve(self).await
    }
}
