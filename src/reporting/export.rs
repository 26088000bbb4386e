use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::db::Database;
use crate::errors::BreachwatchError;
use crate::models::{Incident, IncidentFilter, IncidentStatus, Severity};
use crate::utils::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [Self::Csv, Self::Json];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Csv => "Comma-separated values, one incident per row",
            Self::Json => "JSON document with export metadata and an incidents array",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = BreachwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BreachwatchError::Validation(format!("unsupported export format '{}'", s)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    #[serde(default = "default_format")]
    pub format: ExportFormat,
    /// Adds the breach and notification columns.
    #[serde(default = "default_true")]
    pub include_breach: bool,
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub is_data_breach: Option<bool>,
    #[serde(default)]
    pub detected_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub detected_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub incident_type_id: Option<i64>,
    /// Case-insensitive match against number, title and description.
    #[serde(default)]
    pub query: Option<String>,
    /// Restricts the export to these incident ids. Empty means no restriction.
    #[serde(default)]
    pub ids: Option<Vec<i64>>,
}

fn default_format() -> ExportFormat {
    ExportFormat::Csv
}

fn default_true() -> bool {
    true
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
            include_breach: true,
            status: None,
            severity: None,
            is_data_breach: None,
            detected_from: None,
            detected_to: None,
            incident_type_id: None,
            query: None,
            ids: None,
        }
    }
}

impl ExportRequest {
    fn filter(&self) -> IncidentFilter {
        IncidentFilter {
            status: self.status,
            severity: self.severity,
            is_data_breach: self.is_data_breach,
            detected_from: self.detected_from,
            detected_to: self.detected_to,
            incident_type_id: self.incident_type_id,
            query: self.query.clone().filter(|q| !q.trim().is_empty()),
            ..Default::default()
        }
    }

    /// Incidents selected by the filters and, when given, the id list.
    pub fn collect(&self, db: &Database) -> Result<Vec<Incident>, BreachwatchError> {
        let mut incidents = collect_incidents(db, self.filter())?;
        if let Some(ids) = self.ids.as_ref().filter(|ids| !ids.is_empty()) {
            let wanted: HashSet<i64> = ids.iter().copied().collect();
            incidents.retain(|i| wanted.contains(&i.id));
        }
        Ok(incidents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub job_id: String,
    pub status: ExportJobStatus,
    pub format: ExportFormat,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub download_url: Option<String>,
    pub total_records: usize,
    pub error_message: Option<String>,
}

impl ExportJob {
    pub fn pending(format: ExportFormat) -> Self {
        Self {
            job_id: format!("export_{}", uuid::Uuid::new_v4().simple()),
            status: ExportJobStatus::Pending,
            format,
            created_at: Utc::now(),
            completed_at: None,
            download_url: None,
            total_records: 0,
            error_message: None,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.job_id, self.format.extension())
    }
}

const PAGE: u32 = 1000;

/// All incidents matching the filter, newest detection first.
pub fn collect_incidents(db: &Database, mut filter: IncidentFilter) -> Result<Vec<Incident>, BreachwatchError> {
    let mut incidents = Vec::new();
    let mut offset = 0u32;
    loop {
        filter.limit = Some(PAGE);
        filter.offset = Some(offset);
        let page = db.list_incidents(&filter)?;
        let fetched = page.items.len() as u32;
        incidents.extend(page.items);
        if fetched < PAGE {
            break;
        }
        offset += PAGE;
    }
    Ok(incidents)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn opt_ts(ts: &Option<DateTime<Utc>>) -> String {
    ts.as_ref().map(time::to_db).unwrap_or_default()
}

const BASE_COLUMNS: [&str; 10] = [
    "ID", "Incident Number", "Title", "Status", "Severity", "Incident Type ID",
    "Reported By", "Assigned To", "Detected At", "Resolved At",
];
const BREACH_COLUMNS: [&str; 6] = [
    "Data Breach", "Affected Records", "Requires Notification",
    "Notification Deadline", "Notification Sent At", "Notification Completed",
];

pub fn render_csv(incidents: &[Incident], include_breach: bool) -> String {
    let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
    if include_breach {
        header.extend(BREACH_COLUMNS);
    }
    let mut out = header.join(",");
    out.push_str("\r\n");

    for i in incidents {
        let mut row = vec![
            i.id.to_string(),
            i.incident_number.clone(),
            i.title.clone(),
            i.status.to_string(),
            i.severity.to_string(),
            i.incident_type_id.map(|t| t.to_string()).unwrap_or_default(),
            i.reported_by.clone().unwrap_or_default(),
            i.assigned_to.clone().unwrap_or_default(),
            time::to_db(&i.detected_at),
            opt_ts(&i.resolved_at),
        ];
        if include_breach {
            row.extend([
                i.is_data_breach.to_string(),
                i.affected_records.to_string(),
                i.requires_notification.to_string(),
                opt_ts(&i.notification_deadline),
                opt_ts(&i.notification_sent_at),
                i.notification_completed.to_string(),
            ]);
        }
        let line: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

pub fn render_json(incidents: &[Incident], include_breach: bool) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = incidents
        .iter()
        .map(|i| {
            let mut row = json!({
                "id": i.id,
                "incident_number": i.incident_number,
                "title": i.title,
                "status": i.status,
                "severity": i.severity,
                "incident_type_id": i.incident_type_id,
                "reported_by": i.reported_by,
                "assigned_to": i.assigned_to,
                "detected_at": i.detected_at,
                "resolved_at": i.resolved_at,
            });
            if include_breach {
                row["is_data_breach"] = json!(i.is_data_breach);
                row["affected_records"] = json!(i.affected_records);
                row["requires_notification"] = json!(i.requires_notification);
                row["notification_deadline"] = json!(i.notification_deadline);
                row["notification_sent_at"] = json!(i.notification_sent_at);
                row["notification_completed"] = json!(i.notification_completed);
            }
            row
        })
        .collect();

    json!({
        "export_date": Utc::now(),
        "total_records": rows.len(),
        "incidents": rows,
    })
}

pub fn render(incidents: &[Incident], format: ExportFormat, include_breach: bool) -> Result<String, BreachwatchError> {
    Ok(match format {
        ExportFormat::Csv => render_csv(incidents, include_breach),
        ExportFormat::Json => serde_json::to_string_pretty(&render_json(incidents, include_breach))?,
    })
}

/// Renders the matching incidents into `dir/file_name`. Returns the path
/// and the number of rows written.
pub async fn write_export(
    db: &Database,
    request: &ExportRequest,
    dir: &Path,
    file_name: &str,
) -> Result<(PathBuf, usize), BreachwatchError> {
    let incidents = request.collect(db)?;
    let body = render(&incidents, request.format, request.include_breach)?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, body).await?;

    info!(path = %path.display(), records = incidents.len(), format = %request.format, "Export written");
    Ok((path, incidents.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewIncident;

    fn seeded() -> Database {
        let db = Database::in_memory().unwrap();
        db.create_incident(&NewIncident {
            title: "Phish, then \"wire\" fraud".into(),
            severity: Some(Severity::High),
            ..Default::default()
        }, None).unwrap();
        let breach = db.create_incident(&NewIncident { title: "DB dump".into(), ..Default::default() }, None).unwrap();
        db.set_breach_fields(breach.id, Some(1200), true, Some(Utc::now()), None).unwrap();
        db
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_csv_columns() {
        let db = seeded();
        let incidents = collect_incidents(&db, IncidentFilter::default()).unwrap();

        let with_breach = render_csv(&incidents, true);
        let header = with_breach.lines().next().unwrap();
        assert_eq!(header.split(',').count(), 16);
        assert!(with_breach.contains("\"Phish, then \"\"wire\"\" fraud\""));

        let without = render_csv(&incidents, false);
        assert_eq!(without.lines().next().unwrap().split(',').count(), 10);
        assert_eq!(without.lines().count(), 3);
    }

    #[test]
    fn test_json_envelope() {
        let db = seeded();
        let incidents = collect_incidents(&db, IncidentFilter { is_data_breach: Some(true), ..Default::default() }).unwrap();
        let doc = render_json(&incidents, true);
        assert_eq!(doc["total_records"], 1);
        assert_eq!(doc["incidents"][0]["affected_records"], 1200);
        assert!(doc["export_date"].is_string());

        let slim = render_json(&incidents, false);
        assert!(slim["incidents"][0].get("affected_records").is_none());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[tokio::test]
    async fn test_write_export_file() {
        let db = seeded();
        let dir = tempfile::tempdir().unwrap();
        let job = ExportJob::pending(ExportFormat::Json);
        let request = ExportRequest { format: ExportFormat::Json, ..Default::default() };

        let (path, count) = write_export(&db, &request, dir.path(), &job.file_name()).await.unwrap();
        assert_eq!(count, 2);
        assert!(path.to_string_lossy().ends_with(".json"));
        let parsed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed["incidents"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_request_filters_by_query_type_and_ids() {
        let db = seeded();
        let malware = db.get_incident_type_by_name("malware").unwrap().unwrap();
        let typed = db.create_incident(&NewIncident {
            title: "Trojan on build agent".into(),
            incident_type_id: Some(malware.id),
            ..Default::default()
        }, None).unwrap();

        let by_query = ExportRequest { query: Some("dump".into()), ..Default::default() };
        let found = by_query.collect(&db).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "DB dump");

        let by_type = ExportRequest { incident_type_id: Some(malware.id), ..Default::default() };
        let found = by_type.collect(&db).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, typed.id);

        let by_ids = ExportRequest { ids: Some(vec![typed.id, 9999]), ..Default::default() };
        let found = by_ids.collect(&db).unwrap();
        assert_eq!(found.iter().map(|i| i.id).collect::<Vec<_>>(), vec![typed.id]);

        let unrestricted = ExportRequest { ids: Some(vec![]), ..Default::default() };
        assert_eq!(unrestricted.collect(&db).unwrap().len(), 3);
    }

    #[test]
    fn test_request_deserializes_new_filters() {
        let req: ExportRequest = serde_json::from_value(serde_json::json!({
            "format": "json",
            "query": "phish",
            "incident_type_id": 3,
            "ids": [1, 2]
        })).unwrap();
        assert_eq!(req.query.as_deref(), Some("phish"));
        assert_eq!(req.incident_type_id, Some(3));
        assert_eq!(req.ids, Some(vec![1, 2]));
    }
}
