//! In-memory platform: simulated units with a frequency table.
//!
//! Every request is recorded before it is resolved, which makes the platform
//! double as a dispatcher spy in tests.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use tracing::debug;

use crate::governor::{Bounds, Error, Policies, Relation, Transition, UnitId};

use super::table::FrequencyTable;

/// A transition request as received by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub unit: UnitId,
    pub freq: u32,
    pub relation: Relation,
}

#[derive(Debug, Clone)]
struct SimUnit {
    bounds: Bounds,
    table: FrequencyTable,
    reject: bool,
}

#[derive(Debug, Default)]
pub struct SimPlatform {
    units: RwLock<BTreeMap<UnitId, SimUnit>>,
    requests: Mutex<Vec<Request>>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SimPlatform::add_unit`].
    pub fn with_unit(self, unit: UnitId, bounds: Bounds, freqs: Vec<u32>) -> Self {
        self.add_unit(unit, bounds, freqs);
        self
    }

    /// Adds or replaces a unit.
    pub fn add_unit(&self, unit: UnitId, bounds: Bounds, freqs: Vec<u32>) {
        self.units.write().insert(
            unit,
            SimUnit {
                bounds,
                table: FrequencyTable::new(freqs),
                reject: false,
            },
        );
    }

    /// Changes the limits of a unit, as firmware or thermal code would.
    /// The current frequency is left alone; reacting is the governor's job.
    pub fn set_limits(&self, unit: UnitId, min: u32, max: u32) -> Result<(), Error> {
        let mut units = self.units.write();
        let sim = units.get_mut(&unit).ok_or(Error::UnknownUnit(unit))?;
        sim.bounds.min = min;
        sim.bounds.max = max;
        Ok(())
    }

    pub fn set_current(&self, unit: UnitId, cur: u32) -> Result<(), Error> {
        let mut units = self.units.write();
        let sim = units.get_mut(&unit).ok_or(Error::UnknownUnit(unit))?;
        sim.bounds.cur = cur;
        Ok(())
    }

    /// Makes every following request for the unit fail with `InvalidFrequency`.
    pub fn reject(&self, unit: UnitId, reject: bool) -> Result<(), Error> {
        let mut units = self.units.write();
        let sim = units.get_mut(&unit).ok_or(Error::UnknownUnit(unit))?;
        sim.reject = reject;
        Ok(())
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.requests.lock().last().copied()
    }
}

impl Policies for SimPlatform {
    fn bounds(&self, unit: UnitId) -> Result<Bounds, Error> {
        self.units
            .read()
            .get(&unit)
            .map(|sim| sim.bounds)
            .ok_or(Error::UnknownUnit(unit))
    }

    fn units(&self) -> Result<Vec<UnitId>, Error> {
        Ok(self.units.read().keys().copied().collect())
    }
}

impl Transition for SimPlatform {
    fn request(&self, unit: UnitId, freq: u32, relation: Relation) -> Result<(), Error> {
        self.requests.lock().push(Request {
            unit,
            freq,
            relation,
        });

        let mut units = self.units.write();
        let sim = units.get_mut(&unit).ok_or(Error::UnknownUnit(unit))?;
        if sim.reject {
            return Err(Error::InvalidFrequency {
                unit,
                freq,
                relation,
            });
        }

        let resolved = sim.table.resolve(unit, freq, relation, &sim.bounds)?;
        debug!(
            component = "platform",
            platform = "sim",
            event = "transition",
            unit = unit,
            from_khz = sim.bounds.cur,
            to_khz = resolved,
            "frequency changed"
        );
        sim.bounds.cur = resolved;
        Ok(())
    }
}
