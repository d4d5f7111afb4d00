//! Speed controller: the operator's explicit-set entry point.

use axum::{extract::Path, response::Response, routing::get, Router};
use std::sync::Arc;
use tracing::info;

use crate::governor::{Error, Governor, UnitId};
use crate::http::Controller;

use super::response::{bad_request, error_response, khz_response};

pub const SPEED_PATH: &str = "/hatsune/units/:id/speed";

/// Parses a frequency written by an operator: decimal kHz, surrounding whitespace allowed.
pub fn parse_khz(body: &str) -> Option<u32> {
    body.trim().parse::<u32>().ok()
}

/// SpeedController reads the current frequency of a unit and sets its target.
#[derive(Clone)]
pub struct SpeedController {
    governor: Arc<dyn Governor>,
}

impl SpeedController {
    /// Creates a new speed controller.
    pub fn new(governor: Arc<dyn Governor>) -> Self {
        Self { governor }
    }

    /// Runs a governor call on the blocking pool: it may hold the governor
    /// lock across a sysfs write.
    async fn blocking<T, F>(&self, unit: UnitId, call: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Governor) -> Result<T, Error> + Send + 'static,
    {
        let governor = self.governor.clone();
        tokio::task::spawn_blocking(move || call(governor.as_ref()))
            .await
            .unwrap_or_else(|err| {
                Err(Error::Driver {
                    unit,
                    reason: err.to_string(),
                })
            })
    }

    /// Handles GET: the unit's current operating frequency.
    async fn show(&self, unit: UnitId) -> Response {
        match self.blocking(unit, move |gov| gov.get_speed(unit)).await {
            Ok(freq) => khz_response(freq),
            Err(err) => error_response(&err),
        }
    }

    /// Handles PUT: stores the new target and requests the transition.
    async fn store(&self, unit: UnitId, body: String) -> Response {
        let Some(freq) = parse_khz(&body) else {
            return bad_request("body must be a frequency in kHz");
        };

        match self.blocking(unit, move |gov| gov.set_speed(unit, freq)).await {
            Ok(()) => {
                info!(
                    component = "speed-controller",
                    event = "set_speed",
                    unit = unit,
                    freq_khz = freq,
                    "target frequency set"
                );
                khz_response(freq)
            }
            Err(err) => error_response(&err),
        }
    }
}

impl Controller for SpeedController {
    fn add_route(&self, router: Router) -> Router {
        let show_ctrl = self.clone();
        let store_ctrl = self.clone();
        router.route(
            SPEED_PATH,
            get(move |Path(unit): Path<UnitId>| {
                let controller = show_ctrl.clone();
                async move { controller.show(unit).await }
            })
            .put(move |Path(unit): Path<UnitId>, body: String| {
                let controller = store_ctrl.clone();
                async move { controller.store(unit, body).await }
            }),
        )
    }
}
