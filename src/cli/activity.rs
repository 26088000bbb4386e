use chrono::Utc;

use crate::cli::commands::ActivityCommand;
use crate::cli::{open_db, print_json, resolve_incident};
use crate::config::BreachwatchConfig;
use crate::errors::BreachwatchError;
use crate::models::{ActivityAction, NewActivity, TimelineInterval};
use crate::reporting::formatter::format_activity_line;

pub fn handle_activity(command: ActivityCommand, config: &BreachwatchConfig) -> Result<(), BreachwatchError> {
    let db = open_db(config)?;
    match command {
        ActivityCommand::List(args) => {
            let incident = resolve_incident(&db, &args.incident)?;
            let activities = db.list_activities(incident.id)?;
            if args.json {
                return print_json(&activities);
            }
            for activity in &activities {
                println!("{}", format_activity_line(activity));
            }
            Ok(())
        }
        ActivityCommand::Comment(args) => {
            if args.comment.trim().is_empty() {
                return Err(BreachwatchError::Validation("comment must not be empty".into()));
            }
            let incident = resolve_incident(&db, &args.incident)?;
            let activity = db.add_activity(
                incident.id,
                &NewActivity::new(ActivityAction::Comment, args.comment.trim()).by(args.by.as_deref()),
            )?;
            println!("{}", format_activity_line(&activity));
            Ok(())
        }
        ActivityCommand::Stats(args) => {
            let since = Utc::now() - chrono::Duration::days(args.days.clamp(1, 365));
            let stats = db.activity_stats(since)?;
            if args.json {
                return print_json(&stats);
            }
            println!("{} events since {}", stats.total_events, stats.since.format("%Y-%m-%d %H:%M"));
            for tally in &stats.events_by_action {
                println!("  {:<22} {}", tally.name, tally.count);
            }
            if !stats.events_by_performer.is_empty() {
                println!("By performer:");
                for tally in &stats.events_by_performer {
                    println!("  {:<22} {}", tally.name, tally.count);
                }
            }
            Ok(())
        }
        ActivityCommand::Timeline(args) => {
            let since = Utc::now() - chrono::Duration::days(args.days.clamp(1, 365));
            let interval: TimelineInterval = args.interval.parse()?;
            let buckets = db.activity_timeline(since, interval)?;
            if args.json {
                return print_json(&buckets);
            }
            for b in &buckets {
                println!("{:<14} {:>5} events  {:>3} performers", b.bucket, b.event_count, b.unique_performers);
            }
            Ok(())
        }
    }
}
