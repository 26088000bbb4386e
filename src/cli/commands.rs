use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "breachwatch", version, about = "Incident response and breach notification tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// YAML configuration file (defaults to ./breachwatch.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// SQLite database path, overrides the config file
    #[arg(long, global = true)]
    pub db: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP REST API server
    Serve(ServeArgs),
    /// Run the security checks and write the HTML/JSON report
    Check(CheckArgs),
    /// Create, inspect and move incidents
    #[command(subcommand)]
    Incident(IncidentCommand),
    /// Manage incident types
    #[command(subcommand)]
    Type(TypeCommand),
    /// Queue and track stakeholder notifications
    #[command(subcommand)]
    Notify(NotifyCommand),
    /// Inspect the audit trail
    #[command(subcommand)]
    Activity(ActivityCommand),
    /// List data breaches past their notification deadline
    Overdue(JsonFlag),
    /// Dashboard counts
    Stats(JsonFlag),
    /// Export incidents to CSV or JSON
    Export(ExportArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct JsonFlag {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Listen address
    #[arg(long)]
    pub host: Option<String>,
}

#[derive(Args, Clone, Default)]
pub struct CheckArgs {
    /// Directory holding package.json for the dependency audit
    #[arg(long)]
    pub project_dir: Option<String>,

    /// Read a saved `npm audit --json` report instead of running npm
    #[arg(long)]
    pub audit_report: Option<String>,

    /// Container image to scan (repeatable)
    #[arg(long = "image")]
    pub images: Vec<String>,

    /// Root of the secret scan
    #[arg(long)]
    pub source_dir: Option<String>,

    /// Glob excluded from the secret scan (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// URL whose response headers are checked
    #[arg(long)]
    pub header_url: Option<String>,

    /// Report output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Highest tolerated critical count
    #[arg(long)]
    pub max_critical: Option<u64>,

    /// Highest tolerated high count
    #[arg(long)]
    pub max_high: Option<u64>,

    /// Print the JSON report instead of the summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Clone)]
pub enum IncidentCommand {
    /// Open a new incident
    Create(CreateIncidentArgs),
    /// List incidents
    List(ListIncidentArgs),
    /// Show one incident with breach state and consistency warnings
    Show(ShowArgs),
    /// Edit descriptive fields
    Update(UpdateIncidentArgs),
    /// Move an incident through its lifecycle
    Status(StatusArgs),
    /// Flag an incident as a data breach
    Breach(BreachArgs),
    /// Record that the breach notification went out
    Notified(NotifiedArgs),
    /// Delete an incident and its history
    Delete(IncidentRef),
}

#[derive(Args, Clone)]
pub struct IncidentRef {
    /// Numeric id or incident number (INC-YYYY-NNNNN)
    pub incident: String,
}

#[derive(Args, Clone)]
pub struct CreateIncidentArgs {
    #[arg(short, long)]
    pub title: String,

    #[arg(short, long)]
    pub description: Option<String>,

    /// low, medium, high or critical
    #[arg(short, long)]
    pub severity: Option<String>,

    /// Incident type id or name
    #[arg(long = "type")]
    pub incident_type: Option<String>,

    #[arg(long)]
    pub reported_by: Option<String>,

    #[arg(long)]
    pub assigned_to: Option<String>,

    /// Explicit incident number instead of the generated one
    #[arg(long)]
    pub number: Option<String>,

    /// Detection time (RFC 3339), defaults to now
    #[arg(long)]
    pub detected_at: Option<String>,
}

#[derive(Args, Clone)]
pub struct ListIncidentArgs {
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub severity: Option<String>,

    /// Only data breaches
    #[arg(long)]
    pub breach: bool,

    /// Free-text match on number, title and description
    #[arg(short, long)]
    pub query: Option<String>,

    #[arg(long, default_value = "50")]
    pub limit: u32,

    #[arg(long, default_value = "0")]
    pub offset: u32,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ShowArgs {
    pub incident: String,

    /// Include the activity history
    #[arg(long)]
    pub history: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct UpdateIncidentArgs {
    pub incident: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub severity: Option<String>,

    #[arg(long)]
    pub assigned_to: Option<String>,

    #[arg(long)]
    pub affected_records: Option<i64>,

    #[arg(long)]
    pub root_cause: Option<String>,

    #[arg(long)]
    pub remediation: Option<String>,

    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Args, Clone)]
pub struct StatusArgs {
    pub incident: String,

    /// open, investigating, contained, resolved or closed
    pub status: String,

    #[arg(long)]
    pub actor: Option<String>,

    /// Write the status without lifecycle checks
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Clone)]
pub struct BreachArgs {
    pub incident: String,

    #[arg(long)]
    pub records: Option<i64>,

    /// The breach does not require a regulator notification
    #[arg(long)]
    pub no_notification: bool,

    /// Override the notification window in hours
    #[arg(long)]
    pub deadline_hours: Option<u32>,

    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Args, Clone)]
pub struct NotifiedArgs {
    pub incident: String,

    /// Send time (RFC 3339), defaults to now
    #[arg(long)]
    pub at: Option<String>,

    /// Record the send without marking notification complete
    #[arg(long)]
    pub partial: bool,

    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum TypeCommand {
    /// List incident types
    List(JsonFlag),
    /// Add an incident type
    Create(CreateTypeArgs),
    /// Delete an unused incident type
    Delete(TypeIdArgs),
}

#[derive(Args, Clone)]
pub struct CreateTypeArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,

    /// 1 (most severe) to 4
    #[arg(long, default_value = "3")]
    pub severity_level: u8,

    /// Regulatory notification window
    #[arg(long)]
    pub deadline_hours: Option<u32>,
}

#[derive(Args, Clone)]
pub struct TypeIdArgs {
    pub id: i64,
}

#[derive(Subcommand, Clone)]
pub enum NotifyCommand {
    /// Queue a notification for an incident
    Create(CreateNotificationArgs),
    /// List notifications for an incident, or by status across incidents
    List(ListNotificationArgs),
    /// Update a notification's delivery status
    Status(NotificationStatusArgs),
}

#[derive(Args, Clone)]
pub struct CreateNotificationArgs {
    pub incident: String,

    /// regulator, data_subjects, internal, law_enforcement or other
    #[arg(long)]
    pub recipient_type: String,

    #[arg(long)]
    pub recipient: String,

    /// email, letter, phone, portal or webhook
    #[arg(long)]
    pub channel: String,

    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long)]
    pub message: Option<String>,

    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Args, Clone)]
pub struct ListNotificationArgs {
    /// Incident to list for
    pub incident: Option<String>,

    /// List every notification in this status instead
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct NotificationStatusArgs {
    pub id: i64,

    /// pending, sent, acknowledged or failed
    pub status: String,

    /// Failure reason, stored when the status is failed
    #[arg(long)]
    pub error: Option<String>,

    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum ActivityCommand {
    /// Activity history for an incident
    List(ActivityListArgs),
    /// Add a comment to an incident
    Comment(CommentArgs),
    /// Counts over a look-back window
    Stats(WindowArgs),
    /// Events bucketed by hour or day
    Timeline(WindowArgs),
}

#[derive(Args, Clone)]
pub struct ActivityListArgs {
    pub incident: String,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct CommentArgs {
    pub incident: String,

    pub comment: String,

    #[arg(long)]
    pub by: Option<String>,
}

#[derive(Args, Clone)]
pub struct WindowArgs {
    /// Look-back window in days
    #[arg(long, default_value = "7")]
    pub days: i64,

    /// hour or day
    #[arg(long, default_value = "day")]
    pub interval: String,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ExportArgs {
    /// csv or json
    #[arg(short, long, default_value = "csv")]
    pub format: String,

    /// Output directory, defaults to the configured export directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Leave out the breach and notification columns
    #[arg(long)]
    pub no_breach: bool,

    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub severity: Option<String>,

    /// Only data breaches
    #[arg(long)]
    pub breach: bool,

    /// Incident type id or name
    #[arg(long = "type")]
    pub incident_type: Option<String>,

    /// Free-text match on number, title and description
    #[arg(short, long)]
    pub query: Option<String>,

    /// Export only these incidents (id or number, repeatable)
    #[arg(long = "incident")]
    pub incidents: Vec<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
