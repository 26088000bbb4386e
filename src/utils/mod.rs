pub mod formatting;
pub mod time;
pub mod truncation;
