//! Explicit-set governor: holds each managed unit at the frequency an operator asked for.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::metrics;

use super::api::{Governor, UnitReport};
use super::dispatcher::Dispatcher;
use super::error::Error;
use super::policy::{Bounds, Policies, Relation, Transition, UnitId};
use super::units::Units;

pub const GOVERNOR_NAME: &str = "hatsune";

/// Picks the frequency and relation to request after the limits of a unit changed.
///
/// The stored target itself is never clamped, only the request derived from it.
pub fn clamp_request(setspeed: u32, bounds: &Bounds) -> (u32, Relation) {
    if setspeed > bounds.max {
        (bounds.max, Relation::AtOrAbove)
    } else if setspeed < bounds.min {
        (bounds.min, Relation::AtOrAbove)
    } else {
        (setspeed, Relation::AtOrBelow)
    }
}

/// Governor instance. All units share one lock which also brackets every dispatch.
pub struct SetSpeed {
    units: Mutex<Units>,
    dispatcher: Dispatcher,
    policies: Arc<dyn Policies>,
}

impl SetSpeed {
    pub fn new(policies: Arc<dyn Policies>, driver: Arc<dyn Transition>) -> Self {
        Self {
            units: Mutex::new(Units::new()),
            dispatcher: Dispatcher::new(driver),
            policies,
        }
    }
}

impl Governor for SetSpeed {
    fn name(&self) -> &str {
        GOVERNOR_NAME
    }

    fn attach(&self, unit: UnitId) -> Result<(), Error> {
        self.units.lock().attach(unit)?;
        debug!(component = "governor", event = "attached", unit = unit, "unit attached");
        Ok(())
    }

    fn start(&self, unit: UnitId) -> Result<(), Error> {
        let bounds = self.policies.bounds(unit)?;
        if bounds.cur == 0 {
            error!(
                component = "governor",
                event = "start_refused",
                unit = unit,
                error = %Error::PreconditionViolation(unit),
                "unit has no known current frequency"
            );
            return Err(Error::PreconditionViolation(unit));
        }

        self.units.lock().manage(unit, bounds.cur, bounds.window())?;
        debug!(
            component = "governor",
            event = "started",
            unit = unit,
            setspeed_khz = bounds.cur,
            "started managing unit"
        );
        Ok(())
    }

    fn stop(&self, unit: UnitId) {
        if !self.units.lock().release(unit) {
            debug!(component = "governor", event = "stop_ignored", unit = unit, "unit is not attached");
            return;
        }
        debug!(component = "governor", event = "stopped", unit = unit, "managing unit stopped");
    }

    fn detach(&self, unit: UnitId) {
        match self.units.lock().detach(unit) {
            Some(slot) if slot.managed => warn!(
                component = "governor",
                event = "detached_while_managed",
                unit = unit,
                setspeed_khz = slot.setspeed,
                "unit detached without stop, hardware keeps its last frequency"
            ),
            Some(_) => debug!(component = "governor", event = "detached", unit = unit, "unit detached"),
            None => debug!(component = "governor", event = "detach_ignored", unit = unit, "unit is not attached"),
        }
    }

    fn on_bounds_changed(&self, unit: UnitId) -> Result<(), Error> {
        let mut units = self.units.lock();
        let Some(setspeed) = units.setspeed(unit) else {
            debug!(component = "governor", event = "limits_ignored", unit = unit, "unit is not managed");
            return Ok(());
        };

        let bounds = self.policies.bounds(unit)?;
        debug!(
            component = "governor",
            event = "limits",
            unit = unit,
            min_khz = bounds.min,
            max_khz = bounds.max,
            cur_khz = bounds.cur,
            setspeed_khz = setspeed,
            "limit event"
        );
        metrics::record_limit_event();
        units.observe(unit, bounds.window())?;

        let (freq, relation) = clamp_request(setspeed, &bounds);
        self.dispatcher.dispatch(&units, unit, freq, relation)
    }

    fn set_speed(&self, unit: UnitId, freq: u32) -> Result<(), Error> {
        debug!(component = "governor", event = "set_speed", unit = unit, freq_khz = freq, "explicit set");

        let mut units = self.units.lock();
        if let Err(err) = units.store(unit, freq) {
            metrics::record_set_speed_rejected();
            return Err(err);
        }
        // Intent is kept even if the transition below fails.
        self.dispatcher.dispatch(&units, unit, freq, Relation::AtOrBelow)
    }

    fn get_speed(&self, unit: UnitId) -> Result<u32, Error> {
        Ok(self.policies.bounds(unit)?.cur)
    }

    fn units(&self) -> Vec<UnitReport> {
        self.units
            .lock()
            .snapshot()
            .into_iter()
            .map(|(id, slot)| UnitReport {
                id,
                managed: slot.managed,
                setspeed: slot.setspeed,
                window: slot.window,
            })
            .collect()
    }
}
