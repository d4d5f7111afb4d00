//! Types shared between the governor and the platform it drives.

use serde::Serialize;
use std::fmt;

use super::error::Error;

/// Stable index of a frequency-controllable unit (a CPU or a cpufreq policy group).
pub type UnitId = u32;

/// Bounds advertised by the platform for a unit, all in kHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
    pub cur: u32,
}

impl Bounds {
    pub fn new(min: u32, max: u32, cur: u32) -> Self {
        Self { min, max, cur }
    }

    /// Returns true if `freq` lies inside `[min, max]`.
    pub fn contains(&self, freq: u32) -> bool {
        freq >= self.min && freq <= self.max
    }

    /// The limits alone, without the current frequency.
    pub fn window(&self) -> Window {
        Window {
            min: self.min,
            max: self.max,
        }
    }
}

/// The `[min, max]` limits of a unit in kHz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Window {
    pub min: u32,
    pub max: u32,
}

/// How the transition mechanism picks a supported frequency around a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    /// Nearest supported frequency at or below the target.
    AtOrBelow,
    /// Nearest supported frequency at or above the target.
    AtOrAbove,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::AtOrBelow => "at-or-below",
            Relation::AtOrAbove => "at-or-above",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to the bounds the platform advertises for each unit.
pub trait Policies: Send + Sync {
    /// Returns the `(min, max, cur)` triple of a unit.
    fn bounds(&self, unit: UnitId) -> Result<Bounds, Error>;

    /// Lists every unit the platform knows about, in ascending order.
    fn units(&self) -> Result<Vec<UnitId>, Error>;
}

/// The frequency-transition primitive.
///
/// Implementations perform the actual hardware (or simulated) change; the governor
/// only decides what to ask for.
pub trait Transition: Send + Sync {
    fn request(&self, unit: UnitId, freq: u32, relation: Relation) -> Result<(), Error>;
}
