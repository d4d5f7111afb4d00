//! Frequency-transition mechanisms and bounds sources the governor can drive.

pub mod sim;
pub mod sysfs;
pub mod table;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{self, PlatformKind};
use crate::governor::{Bounds, Error, Policies, Transition, UnitId};

pub use sim::{Request, SimPlatform};
pub use sysfs::SysfsPlatform;
pub use table::FrequencyTable;

/// A configured platform. Both variants serve as bounds source and transition driver.
#[derive(Clone)]
pub enum Platform {
    Sysfs {
        platform: Arc<SysfsPlatform>,
        claim_governor: bool,
    },
    Sim(Arc<SimPlatform>),
}

impl Platform {
    /// Builds the platform described by the config.
    pub fn build(cfg: &config::Platform) -> Result<Self> {
        match cfg.kind {
            PlatformKind::Sysfs => {
                let sysfs_cfg = cfg.sysfs.as_ref();
                let root = sysfs_cfg
                    .and_then(|s| s.root.clone())
                    .unwrap_or_else(|| sysfs::DEFAULT_ROOT.to_string());
                Ok(Platform::Sysfs {
                    platform: Arc::new(SysfsPlatform::new(root)),
                    claim_governor: sysfs_cfg.map_or(false, |s| s.claim_governor),
                })
            }
            PlatformKind::Sim => {
                let sim = cfg
                    .sim
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("sim platform requires platform.sim"))?;
                let platform = SimPlatform::new();
                for unit in &sim.units {
                    platform.add_unit(
                        unit.id,
                        Bounds::new(unit.min, unit.max, unit.cur),
                        unit.frequencies.clone(),
                    );
                }
                Ok(Platform::Sim(Arc::new(platform)))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Platform::Sysfs { .. } => "sysfs",
            Platform::Sim(_) => "sim",
        }
    }

    pub fn policies(&self) -> Arc<dyn Policies> {
        match self {
            Platform::Sysfs { platform, .. } => platform.clone() as Arc<dyn Policies>,
            Platform::Sim(platform) => platform.clone() as Arc<dyn Policies>,
        }
    }

    pub fn driver(&self) -> Arc<dyn Transition> {
        match self {
            Platform::Sysfs { platform, .. } => platform.clone() as Arc<dyn Transition>,
            Platform::Sim(platform) => platform.clone() as Arc<dyn Transition>,
        }
    }

    /// Prepares a unit for explicit control before the governor attaches to it.
    pub fn claim(&self, unit: UnitId) -> Result<(), Error> {
        match self {
            Platform::Sysfs {
                platform,
                claim_governor: true,
            } => platform.claim(unit),
            _ => Ok(()),
        }
    }
}
