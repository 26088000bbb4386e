use crate::db::{Database, StatusWrite};
use crate::errors::BreachwatchError;
use crate::models::{Incident, IncidentStatus};

/// Whether `from -> to` is a legal lifecycle move.
///
/// Forward moves may skip stages. The only backward move is reopening a
/// resolved incident into investigation. Closed is terminal.
pub fn is_allowed(from: IncidentStatus, to: IncidentStatus) -> bool {
    use crate::models::IncidentStatus::*;
    match (from, to) {
        (Closed, _) => false,
        (Resolved, Investigating) => true,
        _ => to.stage() > from.stage(),
    }
}

pub fn check_transition(from: IncidentStatus, to: IncidentStatus) -> Result<(), BreachwatchError> {
    if is_allowed(from, to) {
        Ok(())
    } else {
        Err(BreachwatchError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// States reachable from `from` in one move.
pub fn next_states(from: IncidentStatus) -> Vec<IncidentStatus> {
    IncidentStatus::ALL
        .into_iter()
        .filter(|to| is_allowed(from, *to))
        .collect()
}

/// Guarded status change. The guard runs against the row inside the write
/// transaction, so a concurrent writer cannot slip an illegal move through.
pub fn advance_status(
    db: &Database,
    id: i64,
    to: IncidentStatus,
    actor: Option<&str>,
) -> Result<Incident, BreachwatchError> {
    let options = StatusWrite {
        backfill_resolved: to == IncidentStatus::Closed,
        clear_resolution: to == IncidentStatus::Investigating,
    };
    db.write_status(id, to, options, actor, |current| check_transition(current.status, to))
}
