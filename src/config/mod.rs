// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::governor::UnitId;

pub const PROD: &str = "prod";
#[allow(dead_code)]
pub const DEV: &str = "dev";
#[allow(dead_code)]
pub const DEBUG: &str = "debug";
#[allow(dead_code)]
pub const TEST: &str = "test";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Hatsune {
    #[serde(rename = "hatsune")]
    pub hatsune: HatsuneBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HatsuneBox {
    pub env: String,
    pub logs: Option<Logs>,
    pub api: Option<Api>,
    pub platform: Platform,
    /// Units to manage. All units the platform reports when absent.
    pub units: Option<Vec<UnitId>>,
    pub limits: Option<Limits>,
    pub shutdown: Option<Shutdown>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Api {
    pub name: Option<String>,
    pub port: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Sysfs,
    Sim,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Platform {
    pub kind: PlatformKind,
    pub sysfs: Option<Sysfs>,
    pub sim: Option<Sim>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Sysfs {
    pub root: Option<String>,
    #[serde(rename = "claim_governor", default)]
    pub claim_governor: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Sim {
    pub units: Vec<SimUnit>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimUnit {
    pub id: UnitId,
    pub min: u32,
    pub max: u32,
    pub cur: u32,
    #[serde(default)]
    pub frequencies: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Limits {
    pub enabled: bool,
    #[serde(rename = "poll_interval", default, with = "humantime_serde")]
    pub poll_interval: Option<Duration>,
}

impl Limits {
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Shutdown {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

// Config trait
pub trait ConfigTrait {
    fn logs(&self) -> Option<&Logs>;
    fn is_prod(&self) -> bool;
    #[allow(dead_code)]
    fn is_debug(&self) -> bool;
    #[allow(dead_code)]
    fn is_dev(&self) -> bool;
    #[allow(dead_code)]
    fn is_test(&self) -> bool;
    fn api(&self) -> Option<&Api>;
    fn platform(&self) -> &Platform;
    fn units(&self) -> Option<&[UnitId]>;
    fn limits(&self) -> Option<&Limits>;
    fn shutdown_timeout(&self) -> Duration;
}

// Config type alias for convenience
pub type Config = Hatsune;

impl ConfigTrait for Config {
    fn logs(&self) -> Option<&Logs> {
        self.hatsune.logs.as_ref()
    }

    fn is_prod(&self) -> bool {
        self.hatsune.env == PROD
    }

    fn is_debug(&self) -> bool {
        self.hatsune.env == DEBUG
    }

    fn is_dev(&self) -> bool {
        self.hatsune.env == DEV
    }

    fn is_test(&self) -> bool {
        self.hatsune.env == TEST
    }

    fn api(&self) -> Option<&Api> {
        self.hatsune.api.as_ref()
    }

    fn platform(&self) -> &Platform {
        &self.hatsune.platform
    }

    fn units(&self) -> Option<&[UnitId]> {
        self.hatsune.units.as_deref()
    }

    fn limits(&self) -> Option<&Limits> {
        self.hatsune.limits.as_ref()
    }

    fn shutdown_timeout(&self) -> Duration {
        self.hatsune
            .shutdown
            .as_ref()
            .and_then(|s| s.timeout)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;

        let cfg = Self::parse(&data).with_context(|| format!("config {:?}", abs_path))?;
        Ok(cfg)
    }

    /// Parses and validates a YAML document.
    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Hatsune = serde_yaml::from_str(data).context("unmarshal yaml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        let platform = &self.hatsune.platform;
        if platform.kind == PlatformKind::Sim {
            match platform.sim.as_ref() {
                Some(sim) if !sim.units.is_empty() => {
                    for unit in &sim.units {
                        if unit.min > unit.max {
                            anyhow::bail!(
                                "sim unit {}: min {} kHz exceeds max {} kHz",
                                unit.id,
                                unit.min,
                                unit.max
                            );
                        }
                    }
                }
                _ => anyhow::bail!("platform.kind is sim but no platform.sim.units configured"),
            }
        }

        if let Some(limits) = self.limits() {
            if limits.enabled && limits.poll_interval() == Duration::ZERO {
                anyhow::bail!("limits.poll_interval must be positive");
            }
        }

        Ok(())
    }
}

// Test config is always available for integration tests
mod test_config;
#[allow(dead_code)]
pub use test_config::new_test_config;
