use console::style;

use crate::checks::CheckStatus;
use crate::models::{Incident, IncidentActivity};
use crate::tracking::{BreachState, ConsistencyIssue};
use crate::utils::formatting::{format_count, format_span};
use super::assembler::SecurityReport;

pub fn format_check_summary(report: &SecurityReport) -> String {
    let mut out = String::new();
    for check in &report.checks {
        let marker = match &check.status {
            CheckStatus::Completed => style("✓").green(),
            CheckStatus::Skipped(_) => style("-").dim(),
            CheckStatus::Failed(_) => style("✗").red(),
        };
        out.push_str(&format!("  {} {:<18}", marker, check.name));
        match check.status.reason() {
            Some(reason) => out.push_str(&format!(" {}", style(reason).dim())),
            None => out.push_str(&format!(
                " critical {} high {} medium {} secrets {}",
                check.counters.critical, check.counters.high, check.counters.medium, check.counters.secrets
            )),
        }
        out.push('\n');
    }

    let c = &report.counters;
    out.push_str(&format!(
        "\n  Critical: {}  High: {}  Medium: {}  Secrets: {}\n",
        style(c.critical).red().bold(),
        style(c.high).yellow().bold(),
        style(c.medium).bold(),
        style(c.secrets).magenta().bold(),
    ));

    for m in report.secret_matches() {
        out.push_str(&format!("  secret pattern {} in {}:{}\n", style(&m.pattern).magenta(), m.file, m.line));
    }
    let missing: Vec<&String> = report.missing_headers().collect();
    if !missing.is_empty() {
        out.push_str(&format!(
            "  missing headers: {}\n",
            missing.iter().map(|h| h.as_str()).collect::<Vec<_>>().join(", ")
        ));
    }

    let verdict = if report.exit_code == 0 {
        style("PASS").green().bold()
    } else {
        style("FAIL").red().bold()
    };
    out.push_str(&format!(
        "\n  {} (critical ≤ {}, high ≤ {})\n",
        verdict, report.policy.max_critical, report.policy.max_high
    ));
    out
}

pub fn format_incident_line(incident: &Incident) -> String {
    format!(
        "{:<16} {:<13} {:<8} {}{}",
        incident.incident_number,
        incident.status.as_str(),
        incident.severity.as_str(),
        incident.title,
        if incident.is_data_breach { "  [breach]" } else { "" },
    )
}

pub fn format_incident_detail(
    incident: &Incident,
    state: &BreachState,
    issues: &[ConsistencyIssue],
    now: chrono::DateTime<chrono::Utc>,
) -> String {
    let mut out = format!(
        "{} {}\n  status:    {}\n  severity:  {}\n  detected:  {} ({} ago)\n",
        style(&incident.incident_number).bold(),
        incident.title,
        incident.status,
        incident.severity,
        incident.detected_at.to_rfc3339(),
        format_span(now - incident.detected_at),
    );
    if let Some(assignee) = &incident.assigned_to {
        out.push_str(&format!("  assigned:  {}\n", assignee));
    }
    if incident.is_data_breach {
        out.push_str(&format!(
            "  breach:    {}, {}\n",
            format_count(incident.affected_records.max(0) as u64, "record", "records"),
            state.label()
        ));
        if let Some(deadline) = incident.notification_deadline {
            out.push_str(&format!("  deadline:  {}\n", deadline.to_rfc3339()));
        }
    }
    for issue in issues {
        out.push_str(&format!("  {} {}\n", style("!").yellow(), issue.describe()));
    }
    out
}

pub fn format_activity_line(activity: &IncidentActivity) -> String {
    let change = match (&activity.old_value, &activity.new_value) {
        (Some(old), Some(new)) => format!(" ({} -> {})", old, new),
        (None, Some(new)) => format!(" (-> {})", new),
        _ => String::new(),
    };
    format!(
        "{}  {:<20} {}{}  by {}",
        activity.created_at.format("%Y-%m-%d %H:%M:%S"),
        activity.action_type.as_str(),
        activity.description.as_deref().unwrap_or(""),
        change,
        activity.performed_by.as_deref().unwrap_or("unknown"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{CheckCounters, CheckOutcome, ExitPolicy};
    use crate::db::Database;
    use crate::models::NewIncident;

    #[test]
    fn test_summary_lists_checks_and_verdict() {
        console::set_colors_enabled(false);
        let report = SecurityReport::assemble(
            vec![
                CheckOutcome::completed("dependency_audit", CheckCounters { high: 2, ..Default::default() }),
                CheckOutcome::skipped("image_scan", "trivy not installed"),
            ],
            ExitPolicy::default(),
        );
        let text = format_check_summary(&report);
        assert!(text.contains("dependency_audit"));
        assert!(text.contains("trivy not installed"));
        assert!(text.contains("PASS"));
    }

    #[test]
    fn test_incident_line_marks_breach() {
        let db = Database::in_memory().unwrap();
        let incident = db.create_incident(&NewIncident { title: "Leaked bucket".into(), ..Default::default() }, None).unwrap();
        let marked = db.set_breach_fields(incident.id, Some(10), true, None, None).unwrap();
        let line = format_incident_line(&marked);
        assert!(line.starts_with(&marked.incident_number));
        assert!(line.ends_with("[breach]"));
    }
}
