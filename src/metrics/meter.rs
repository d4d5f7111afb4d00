use crate::governor::{Error, Relation};

// Metric name constants
pub const DISPATCH_TOTAL: &str = "hatsune_dispatch_total";
pub const SET_SPEED_REJECTED_TOTAL: &str = "hatsune_set_speed_rejected_total";
pub const LIMIT_EVENTS_TOTAL: &str = "hatsune_limit_events_total";

const OUTCOME_OK: &str = "ok";

/// Counts one dispatched frequency request, labelled by relation and outcome.
pub fn record_dispatch(relation: Relation, result: &Result<(), Error>) {
    let outcome = match result {
        Ok(()) => OUTCOME_OK,
        Err(err) => err.kind(),
    };
    metrics::counter!(
        DISPATCH_TOTAL,
        "relation" => relation.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Counts an explicit set refused before reaching the dispatcher.
pub fn record_set_speed_rejected() {
    metrics::counter!(SET_SPEED_REJECTED_TOTAL).increment(1);
}

/// Counts a limit event handled for a managed unit.
pub fn record_limit_event() {
    metrics::counter!(LIMIT_EVENTS_TOTAL).increment(1);
}
