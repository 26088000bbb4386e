pub mod types;
pub mod classification;

pub use types::BreachwatchError;
pub use classification::ErrorClassification;
