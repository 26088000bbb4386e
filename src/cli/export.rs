use std::path::PathBuf;

use crate::cli::commands::ExportArgs;
use crate::cli::incident::resolve_type_id;
use crate::cli::{open_db, resolve_incident};
use crate::config::BreachwatchConfig;
use crate::errors::BreachwatchError;
use crate::models::{IncidentStatus, Severity};
use crate::reporting::export::write_export;
use crate::reporting::{ExportFormat, ExportJob, ExportRequest};

pub async fn handle_export(args: ExportArgs, config: &BreachwatchConfig) -> Result<(), BreachwatchError> {
    let db = open_db(config)?;
    let format: ExportFormat = args.format.parse()?;
    let ids = args
        .incidents
        .iter()
        .map(|reference| resolve_incident(&db, reference).map(|i| i.id))
        .collect::<Result<Vec<_>, _>>()?;
    let request = ExportRequest {
        format,
        include_breach: !args.no_breach,
        status: args.status.as_deref().map(str::parse::<IncidentStatus>).transpose()?,
        severity: args.severity.as_deref().map(str::parse::<Severity>).transpose()?,
        is_data_breach: args.breach.then_some(true),
        incident_type_id: args.incident_type.as_deref().map(|t| resolve_type_id(&db, t)).transpose()?,
        query: args.query,
        ids: (!ids.is_empty()).then_some(ids),
        ..Default::default()
    };

    let dir = PathBuf::from(args.output.as_deref().unwrap_or(&config.export.directory));
    let job = ExportJob::pending(format);
    let (path, records) = write_export(&db, &request, &dir, &job.file_name()).await?;
    println!("Exported {} incidents to {}", records, path.display());
    Ok(())
}
