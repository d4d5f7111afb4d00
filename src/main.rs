// Main entrypoint for the hatsune governor service.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use hatsune::app::App;
use hatsune::config::{Config, ConfigTrait};
use hatsune::shutdown::GracefulShutdown;

const CONFIG_PATH: &str = "cfg/hatsune.cfg.yaml";
const CONFIG_PATH_LOCAL: &str = "cfg/hatsune.cfg.local.yaml";

/// hatsune - explicit-set CPU frequency governor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, value_name = "FILE")]
    cfg: Option<PathBuf>,
}

/// Loads the configuration struct from YAML file.
/// Tries local config first, then falls back to default config.
fn load_cfg(path: Option<PathBuf>) -> Result<(Config, String)> {
    if let Some(custom_path) = path {
        let cfg = Config::load(&custom_path)
            .with_context(|| format!("failed to load custom config from {:?}", custom_path))?;
        return Ok((cfg, custom_path.display().to_string()));
    }

    match Config::load(PathBuf::from(CONFIG_PATH_LOCAL)) {
        Ok(cfg) => Ok((cfg, CONFIG_PATH_LOCAL.to_string())),
        Err(_) => {
            let cfg = Config::load(PathBuf::from(CONFIG_PATH))
                .with_context(|| format!("failed to load config from {}", CONFIG_PATH))?;
            Ok((cfg, CONFIG_PATH.to_string()))
        }
    }
}

/// Configures structured logging based on configuration.
fn configure_logger(cfg: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let log_level = cfg
        .logs()
        .and_then(|logs| logs.level.as_ref())
        .map(|s| s.as_str())
        .unwrap_or("info");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if cfg.is_prod() {
        // Production: JSON format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        // Development: Pretty console format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Install the recorder before anything records a metric.
    if let Err(e) = hatsune::controller::metrics::init_prometheus_exporter() {
        eprintln!("Warning: Failed to initialize Prometheus metrics exporter: {}", e);
        eprintln!("Metrics endpoint will not be available");
    }

    tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?
        .block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    let (cfg, cfg_path) = load_cfg(args.cfg)?;

    // Logger needs the config, so config load itself is reported afterwards.
    configure_logger(&cfg);
    info!(
        component = "config",
        event = "load_success",
        path = %cfg_path,
        "config loaded"
    );
    info!(
        component = "main",
        event = "num_cpus",
        num_cpus = num_cpus::get(),
        "online cpus"
    );

    let graceful_shutdown = Arc::new(GracefulShutdown::new(
        shutdown_token.clone(),
        cfg.shutdown_timeout(),
    ));

    let app = App::new(shutdown_token.clone(), cfg)?;
    app.serve(graceful_shutdown.clone()).await?;

    if let Err(e) = graceful_shutdown.await_shutdown().await {
        error!(
            component = "main",
            scope = "service",
            event = "graceful_shutdown_failed",
            error = %e,
            "failed to gracefully shut down service"
        );
        // Units must not stay under a governor that is going away.
        app.close();
        return Err(e);
    }

    Ok(())
}
