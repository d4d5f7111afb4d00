//! Explicit-set frequency governor: lifecycle, per-unit state and request dispatch.

pub mod api;
pub mod dispatcher;
pub mod error;
pub mod governor;
pub mod policy;
pub mod units;

#[cfg(test)]
mod governor_test;

pub use api::{Governor, UnitReport};
pub use error::Error;
pub use governor::{clamp_request, SetSpeed, GOVERNOR_NAME};
pub use policy::{Bounds, Policies, Relation, Transition, UnitId, Window};
