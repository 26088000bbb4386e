pub mod activities;
pub mod connection;
pub mod incident_types;
pub mod incidents;
pub mod notifications;
pub mod rows;
pub mod schema;
pub mod stats;

pub use connection::Database;
pub use incidents::StatusWrite;
