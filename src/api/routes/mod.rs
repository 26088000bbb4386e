pub mod activities;
pub mod export;
pub mod health;
pub mod incident_types;
pub mod incidents;
pub mod notifications;
pub mod stats;
