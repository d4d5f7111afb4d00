// Governor lifecycle and operator interface.

use serde::Serialize;

use super::error::Error;
use super::policy::{UnitId, Window};

/// State of one attached unit as seen by the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub id: UnitId,
    pub managed: bool,
    pub setspeed: u32,
    /// Limits the governor last acted on; zero while unmanaged.
    pub window: Window,
}

/// Governor interface driven by the lifecycle framework and the operator.
pub trait Governor: Send + Sync {
    /// Governor name as registered with the framework.
    fn name(&self) -> &str;

    /// Allocates governor-private state for a unit.
    fn attach(&self, unit: UnitId) -> Result<(), Error>;

    /// Begins managing a unit, using its current frequency as the baseline target.
    fn start(&self, unit: UnitId) -> Result<(), Error>;

    /// Stops managing a unit. Hardware keeps its last frequency.
    fn stop(&self, unit: UnitId);

    /// Releases governor-private state of a unit.
    fn detach(&self, unit: UnitId);

    /// Re-applies the stored target against the unit's new limits.
    fn on_bounds_changed(&self, unit: UnitId) -> Result<(), Error>;

    /// Stores a new target and asks the platform to move to it.
    fn set_speed(&self, unit: UnitId, freq: u32) -> Result<(), Error>;

    /// Current operating frequency advertised by the platform.
    fn get_speed(&self, unit: UnitId) -> Result<u32, Error>;

    /// Snapshot of every attached unit.
    fn units(&self) -> Vec<UnitReport>;
}
