//! Units controller: lists managed units and turns management on and off.

use axum::{
    extract::Path,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::governor::{Error, Governor, Policies, UnitId, UnitReport};
use crate::http::Controller;

use super::response::{error_response, json_response};

pub const UNITS_PATH: &str = "/hatsune/units";
pub const UNIT_ON_PATH: &str = "/hatsune/units/:id/on";
pub const UNIT_OFF_PATH: &str = "/hatsune/units/:id/off";

/// Governor view of a unit merged with the bounds the platform advertises.
#[derive(Debug, Serialize)]
struct UnitView {
    id: UnitId,
    managed: bool,
    setspeed: u32,
    min: Option<u32>,
    max: Option<u32>,
    cur: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// UnitsController exposes the per-unit state and start/stop switches.
#[derive(Clone)]
pub struct UnitsController {
    governor: Arc<dyn Governor>,
    policies: Arc<dyn Policies>,
}

impl UnitsController {
    /// Creates a new units controller.
    pub fn new(governor: Arc<dyn Governor>, policies: Arc<dyn Policies>) -> Self {
        Self { governor, policies }
    }

    fn view(&self, report: UnitReport, message: Option<String>) -> UnitView {
        let bounds = self.policies.bounds(report.id).ok();
        UnitView {
            id: report.id,
            managed: report.managed,
            setspeed: report.setspeed,
            min: bounds.map(|b| b.min),
            max: bounds.map(|b| b.max),
            cur: bounds.map(|b| b.cur),
            message,
        }
    }

    fn report(&self, unit: UnitId) -> Option<UnitReport> {
        self.governor.units().into_iter().find(|r| r.id == unit)
    }

    /// Handles GET /hatsune/units.
    async fn list(&self) -> Response {
        let views: Vec<UnitView> = self
            .governor
            .units()
            .into_iter()
            .map(|report| self.view(report, None))
            .collect();
        json_response(StatusCode::OK, &views)
    }

    /// Handles POST /hatsune/units/:id/on. Attaches the unit first if needed;
    /// a unit attached here is detached again when it fails to start.
    async fn on(&self, unit: UnitId) -> Response {
        let attached_here = match self.report(unit) {
            Some(report) if report.managed => {
                warn!(unit = unit, scope = "on/off", "already managed, nothing to change");
                let message = Some("already managed".to_string());
                return json_response(StatusCode::OK, &self.view(report, message));
            }
            Some(_) => false,
            None => {
                if let Err(err) = self.governor.attach(unit) {
                    return error_response(&err);
                }
                true
            }
        };

        if let Err(err) = self.governor.start(unit) {
            if attached_here {
                self.governor.detach(unit);
            }
            warn!(unit = unit, scope = "on/off", error = %err, "unit could not be started");
            return error_response(&err);
        }
        info!(unit = unit, scope = "on/off", "unit managed");
        self.respond(unit)
    }

    /// Handles POST /hatsune/units/:id/off. The unit stays attached.
    async fn off(&self, unit: UnitId) -> Response {
        if self.report(unit).is_none() {
            return error_response(&Error::NotAttached(unit));
        }
        self.governor.stop(unit);
        info!(unit = unit, scope = "on/off", "unit released");
        self.respond(unit)
    }

    fn respond(&self, unit: UnitId) -> Response {
        match self.report(unit) {
            Some(report) => json_response(StatusCode::OK, &self.view(report, None)),
            None => error_response(&Error::NotAttached(unit)),
        }
    }
}

impl Controller for UnitsController {
    fn add_route(&self, router: Router) -> Router {
        let list_ctrl = self.clone();
        let on_ctrl = self.clone();
        let off_ctrl = self.clone();
        router
            .route(
                UNITS_PATH,
                get(move || {
                    let controller = list_ctrl.clone();
                    async move { controller.list().await }
                }),
            )
            .route(
                UNIT_ON_PATH,
                post(move |Path(unit): Path<UnitId>| {
                    let controller = on_ctrl.clone();
                    async move { controller.on(unit).await }
                }),
            )
            .route(
                UNIT_OFF_PATH,
                post(move |Path(unit): Path<UnitId>| {
                    let controller = off_ctrl.clone();
                    async move { controller.off(unit).await }
                }),
            )
    }
}
