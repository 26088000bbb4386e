use console::style;

use crate::cli::commands::{CreateNotificationArgs, ListNotificationArgs, NotificationStatusArgs, NotifyCommand};
use crate::cli::{open_db, print_json, resolve_incident};
use crate::config::BreachwatchConfig;
use crate::db::Database;
use crate::errors::BreachwatchError;
use crate::models::{IncidentNotification, NewNotification, NotificationStatus};

pub fn handle_notify(command: NotifyCommand, config: &BreachwatchConfig) -> Result<(), BreachwatchError> {
    let db = open_db(config)?;
    match command {
        NotifyCommand::Create(args) => create(&db, args),
        NotifyCommand::List(args) => list(&db, args),
        NotifyCommand::Status(args) => update_status(&db, args),
    }
}

fn format_notification(n: &IncidentNotification) -> String {
    let status = match n.status {
        NotificationStatus::Failed => style(n.status.as_str()).red(),
        NotificationStatus::Pending => style(n.status.as_str()).yellow(),
        _ => style(n.status.as_str()).green(),
    };
    let mut line = format!(
        "{:>4}  {:<15} {:<28} {:<7} {}",
        n.id,
        n.recipient_type.as_str(),
        n.recipient,
        n.channel.as_str(),
        status
    );
    if let Some(err) = &n.error_message {
        line.push_str(&format!("  {}", style(err).dim()));
    }
    line
}

fn create(db: &Database, args: CreateNotificationArgs) -> Result<(), BreachwatchError> {
    let incident = resolve_incident(db, &args.incident)?;
    let new = NewNotification {
        recipient_type: args.recipient_type.parse()?,
        recipient: args.recipient,
        channel: args.channel.parse()?,
        subject: args.subject,
        message: args.message,
    };
    let notification = db.create_notification(incident.id, &new, args.actor.as_deref())?;
    println!("Queued for {}: {}", incident.incident_number, format_notification(&notification));
    Ok(())
}

fn list(db: &Database, args: ListNotificationArgs) -> Result<(), BreachwatchError> {
    let notifications = match (&args.incident, &args.status) {
        (Some(reference), _) => {
            let incident = resolve_incident(db, reference)?;
            let all = db.list_notifications(incident.id)?;
            match args.status.as_deref() {
                Some(raw) => {
                    let status: NotificationStatus = raw.parse()?;
                    all.into_iter().filter(|n| n.status == status).collect()
                }
                None => all,
            }
        }
        (None, Some(raw)) => db.list_notifications_by_status(raw.parse()?)?,
        (None, None) => {
            return Err(BreachwatchError::Validation(
                "give an incident or --status to list notifications".into(),
            ))
        }
    };

    if args.json {
        return print_json(&notifications);
    }
    for n in &notifications {
        println!("{}", format_notification(n));
    }
    Ok(())
}

fn update_status(db: &Database, args: NotificationStatusArgs) -> Result<(), BreachwatchError> {
    let status: NotificationStatus = args.status.parse()?;
    let updated = db.update_notification_status(args.id, status, args.error.as_deref(), args.actor.as_deref())?;
    println!("{}", format_notification(&updated));
    Ok(())
}
