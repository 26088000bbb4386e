use chrono::Utc;
use console::style;

use crate::cli::commands::{
    BreachArgs, CreateIncidentArgs, CreateTypeArgs, IncidentCommand, JsonFlag, ListIncidentArgs,
    NotifiedArgs, ShowArgs, StatusArgs, TypeCommand, UpdateIncidentArgs,
};
use crate::cli::{open_db, parse_time, print_json, resolve_incident};
use crate::config::BreachwatchConfig;
use crate::db::Database;
use crate::errors::BreachwatchError;
use crate::models::{
    BreachDetails, IncidentFilter, IncidentStatus, IncidentUpdate, NewIncident, NewIncidentType, Severity,
};
use crate::reporting::formatter::{format_activity_line, format_incident_detail, format_incident_line};
use crate::tracking::{breach, consistency, lifecycle, BreachState};

pub fn handle_incident(command: IncidentCommand, config: &BreachwatchConfig) -> Result<(), BreachwatchError> {
    let db = open_db(config)?;
    match command {
        IncidentCommand::Create(args) => create(&db, args),
        IncidentCommand::List(args) => list(&db, args),
        IncidentCommand::Show(args) => show(&db, args),
        IncidentCommand::Update(args) => update(&db, args),
        IncidentCommand::Status(args) => status(&db, args),
        IncidentCommand::Breach(args) => mark_breach(&db, args, config.breach.default_deadline_hours),
        IncidentCommand::Notified(args) => notified(&db, args),
        IncidentCommand::Delete(args) => {
            let incident = resolve_incident(&db, &args.incident)?;
            db.delete_incident(incident.id)?;
            println!("Deleted {}", incident.incident_number);
            Ok(())
        }
    }
}

pub(crate) fn resolve_type_id(db: &Database, reference: &str) -> Result<i64, BreachwatchError> {
    let found = match reference.trim().parse::<i64>() {
        Ok(id) => db.get_incident_type(id)?,
        Err(_) => db.get_incident_type_by_name(reference.trim())?,
    };
    found
        .map(|t| t.id)
        .ok_or_else(|| BreachwatchError::NotFound(format!("Incident type {} not found", reference)))
}

fn create(db: &Database, args: CreateIncidentArgs) -> Result<(), BreachwatchError> {
    let new = NewIncident {
        incident_number: args.number,
        title: args.title,
        description: args.description,
        incident_type_id: args.incident_type.as_deref().map(|t| resolve_type_id(db, t)).transpose()?,
        severity: args.severity.as_deref().map(str::parse::<Severity>).transpose()?,
        reported_by: args.reported_by,
        assigned_to: args.assigned_to,
        detected_at: args.detected_at.as_deref().map(parse_time).transpose()?,
    };
    let incident = db.create_incident(&new, new.reported_by.as_deref())?;
    println!("{} {}", style("Created").green(), format_incident_line(&incident));
    Ok(())
}

fn list(db: &Database, args: ListIncidentArgs) -> Result<(), BreachwatchError> {
    let filter = IncidentFilter {
        status: args.status.as_deref().map(str::parse::<IncidentStatus>).transpose()?,
        severity: args.severity.as_deref().map(str::parse::<Severity>).transpose()?,
        is_data_breach: args.breach.then_some(true),
        query: args.query,
        limit: Some(args.limit),
        offset: Some(args.offset),
        ..Default::default()
    };
    let page = db.list_incidents(&filter)?;
    if args.json {
        return print_json(&page);
    }
    for incident in &page.items {
        println!("{}", format_incident_line(incident));
    }
    println!(
        "{}",
        style(format!("{} of {} (page {})", page.items.len(), page.total, page.page)).dim()
    );
    Ok(())
}

fn show(db: &Database, args: ShowArgs) -> Result<(), BreachwatchError> {
    let incident = resolve_incident(db, &args.incident)?;
    let now = Utc::now();
    let state = BreachState::evaluate(&incident, now);
    let issues = consistency::check(&incident);

    if args.json {
        let activities = if args.history { db.list_activities(incident.id)? } else { Vec::new() };
        return print_json(&serde_json::json!({
            "incident": incident,
            "breach": state,
            "consistency": issues,
            "activities": activities,
        }));
    }

    print!("{}", format_incident_detail(&incident, &state, &issues, now));
    let next = lifecycle::next_states(incident.status);
    if !next.is_empty() {
        let names: Vec<&str> = next.iter().map(|s| s.as_str()).collect();
        println!("  next:      {}", names.join(", "));
    }
    if args.history {
        println!();
        for activity in db.list_activities(incident.id)? {
            println!("  {}", format_activity_line(&activity));
        }
    }
    Ok(())
}

fn update(db: &Database, args: UpdateIncidentArgs) -> Result<(), BreachwatchError> {
    let incident = resolve_incident(db, &args.incident)?;
    let update = IncidentUpdate {
        title: args.title,
        description: args.description,
        severity: args.severity.as_deref().map(str::parse::<Severity>).transpose()?,
        assigned_to: args.assigned_to,
        affected_records: args.affected_records,
        root_cause: args.root_cause,
        remediation: args.remediation,
        ..Default::default()
    };
    let updated = db.update_incident(incident.id, &update, args.actor.as_deref())?;
    println!("{} {}", style("Updated").green(), format_incident_line(&updated));
    Ok(())
}

fn status(db: &Database, args: StatusArgs) -> Result<(), BreachwatchError> {
    let incident = resolve_incident(db, &args.incident)?;
    let to: IncidentStatus = args.status.parse()?;
    let updated = if args.force {
        db.set_incident_status(incident.id, to, args.actor.as_deref())?
    } else {
        lifecycle::advance_status(db, incident.id, to, args.actor.as_deref())?
    };
    println!("{} {} -> {}", updated.incident_number, incident.status, updated.status);
    Ok(())
}

fn mark_breach(db: &Database, args: BreachArgs, default_hours: u32) -> Result<(), BreachwatchError> {
    let incident = resolve_incident(db, &args.incident)?;
    let details = BreachDetails {
        affected_records: args.records,
        requires_notification: !args.no_notification,
        deadline_hours: args.deadline_hours,
    };
    let updated = breach::mark_data_breach(db, incident.id, &details, default_hours, args.actor.as_deref())?;
    match updated.notification_deadline {
        Some(deadline) => println!(
            "{} flagged as data breach, notify by {}",
            updated.incident_number,
            style(deadline.to_rfc3339()).yellow()
        ),
        None => println!("{} flagged as data breach, no notification required", updated.incident_number),
    }
    Ok(())
}

fn notified(db: &Database, args: NotifiedArgs) -> Result<(), BreachwatchError> {
    let incident = resolve_incident(db, &args.incident)?;
    let sent_at = match args.at.as_deref() {
        Some(raw) => parse_time(raw)?,
        None => Utc::now(),
    };
    let updated = db.record_notification_sent(incident.id, Some(sent_at), !args.partial, args.actor.as_deref())?;
    let state = BreachState::evaluate(&updated, Utc::now());
    println!("{} {}", updated.incident_number, state.label());
    Ok(())
}

pub fn handle_overdue(args: JsonFlag, config: &BreachwatchConfig) -> Result<(), BreachwatchError> {
    let db = open_db(config)?;
    let now = Utc::now();
    let overdue = breach::overdue_breaches(&db, now)?;
    if args.json {
        return print_json(&overdue);
    }
    if overdue.is_empty() {
        println!("{}", style("No overdue breach notifications").green());
        return Ok(());
    }
    for incident in &overdue {
        let late = incident
            .notification_deadline
            .map(|d| crate::utils::formatting::format_span(now - d))
            .unwrap_or_default();
        println!("{}  {}", format_incident_line(incident), style(format!("overdue by {}", late)).red());
    }
    Ok(())
}

pub fn handle_stats(args: JsonFlag, config: &BreachwatchConfig) -> Result<(), BreachwatchError> {
    let db = open_db(config)?;
    let stats = db.incident_stats(Utc::now())?;
    if args.json {
        return print_json(&stats);
    }
    println!("Incidents:      {} ({} active)", stats.total, stats.active);
    for tally in &stats.by_status {
        println!("  {:<14} {}", tally.name, tally.count);
    }
    println!("Severity:");
    for tally in &stats.by_severity {
        println!("  {:<14} {}", tally.name, tally.count);
    }
    println!("Data breaches:  {} ({} awaiting notification)", stats.data_breaches, stats.open_breaches);
    let overdue = if stats.overdue_breaches > 0 {
        style(stats.overdue_breaches).red().bold()
    } else {
        style(stats.overdue_breaches).green()
    };
    println!("Overdue:        {}", overdue);
    println!("Pending notifications: {}", stats.pending_notifications);
    Ok(())
}

pub fn handle_type(command: TypeCommand, config: &BreachwatchConfig) -> Result<(), BreachwatchError> {
    let db = open_db(config)?;
    match command {
        TypeCommand::List(args) => {
            let types = db.list_incident_types()?;
            if args.json {
                return print_json(&types);
            }
            for t in &types {
                let window = t
                    .notification_deadline_hours
                    .map(|h| format!("{}h", h))
                    .unwrap_or_else(|| "-".to_string());
                println!("{:>3}  {:<22} level {}  notify {}", t.id, t.name, t.severity_level, window);
            }
            Ok(())
        }
        TypeCommand::Create(args) => create_type(&db, args),
        TypeCommand::Delete(args) => {
            if db.delete_incident_type(args.id)? {
                println!("Deleted incident type {}", args.id);
                Ok(())
            } else {
                Err(BreachwatchError::NotFound(format!("Incident type {} not found", args.id)))
            }
        }
    }
}

fn create_type(db: &Database, args: CreateTypeArgs) -> Result<(), BreachwatchError> {
    let created = db.create_incident_type(&NewIncidentType {
        name: args.name,
        description: args.description,
        severity_level: args.severity_level,
        notification_deadline_hours: args.deadline_hours,
    })?;
    println!("Created incident type {} ({})", created.name, created.id);
    Ok(())
}
