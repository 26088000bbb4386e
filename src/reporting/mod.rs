pub mod assembler;
pub mod export;
pub mod formatter;
pub mod html;

pub use assembler::{write_report, SecurityReport};
pub use export::{ExportFormat, ExportJob, ExportJobStatus, ExportRequest};
