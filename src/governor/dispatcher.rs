//! Frequency request dispatcher.

use std::sync::Arc;
use tracing::debug;

use crate::metrics;

use super::error::Error;
use super::policy::{Relation, Transition, UnitId};
use super::units::Units;

/// The only place that calls into the transition mechanism.
///
/// `dispatch` borrows the unit table, which the governor only hands out from
/// under its lock, so a request can never be issued outside the region.
pub struct Dispatcher {
    driver: Arc<dyn Transition>,
}

impl Dispatcher {
    pub fn new(driver: Arc<dyn Transition>) -> Self {
        Self { driver }
    }

    /// Forwards the request and returns the driver's result unmodified.
    pub fn dispatch(
        &self,
        units: &Units,
        unit: UnitId,
        freq: u32,
        relation: Relation,
    ) -> Result<(), Error> {
        if !units.is_managed(unit) {
            return Err(Error::NotManaged(unit));
        }

        debug!(
            component = "dispatcher",
            event = "request",
            unit = unit,
            freq_khz = freq,
            relation = %relation,
            "requesting frequency transition"
        );

        let result = self.driver.request(unit, freq, relation);
        metrics::record_dispatch(relation, &result);
        result
    }
}
