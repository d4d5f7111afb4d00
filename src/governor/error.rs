// Governor error taxonomy.

use super::policy::{Relation, UnitId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unit {0}: cannot allocate governor state")]
    OutOfMemory(UnitId),

    #[error("unit {0} is not managed by the governor")]
    NotManaged(UnitId),

    #[error("unit {unit}: no supported frequency for {freq} kHz ({relation})")]
    InvalidFrequency {
        unit: UnitId,
        freq: u32,
        relation: Relation,
    },

    #[error("unit {0} cannot be started without a known current frequency")]
    PreconditionViolation(UnitId),

    #[error("unit {0} is already attached")]
    AlreadyAttached(UnitId),

    #[error("unit {0} is not attached")]
    NotAttached(UnitId),

    #[error("unit {0} is unknown to the platform")]
    UnknownUnit(UnitId),

    #[error("unit {unit}: transition driver failed: {reason}")]
    Driver { unit: UnitId, reason: String },
}

impl Error {
    /// Unit the error refers to.
    pub fn unit(&self) -> UnitId {
        match self {
            Error::OutOfMemory(unit)
            | Error::NotManaged(unit)
            | Error::PreconditionViolation(unit)
            | Error::AlreadyAttached(unit)
            | Error::NotAttached(unit)
            | Error::UnknownUnit(unit) => *unit,
            Error::InvalidFrequency { unit, .. } | Error::Driver { unit, .. } => *unit,
        }
    }

    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::OutOfMemory(_) => "out_of_memory",
            Error::NotManaged(_) => "not_managed",
            Error::InvalidFrequency { .. } => "invalid_frequency",
            Error::PreconditionViolation(_) => "precondition_violation",
            Error::AlreadyAttached(_) => "already_attached",
            Error::NotAttached(_) => "not_attached",
            Error::UnknownUnit(_) => "unknown_unit",
            Error::Driver { .. } => "driver",
        }
    }
}
