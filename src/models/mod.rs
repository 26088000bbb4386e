pub mod activity;
pub mod incident;
pub mod incident_type;
pub mod notification;
pub mod page;

pub use activity::*;
pub use incident::*;
pub use incident_type::*;
pub use notification::*;
pub use page::*;
