//! Rules layered over the raw incident store: guarded lifecycle moves,
//! breach deadlines and consistency reporting.

pub mod breach;
pub mod consistency;
pub mod lifecycle;

pub use breach::{BreachState, DEFAULT_DEADLINE_HOURS};
pub use consistency::ConsistencyIssue;
