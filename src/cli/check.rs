use std::path::PathBuf;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::checks::{CheckRunner, ExitPolicy};
use crate::cli::commands::CheckArgs;
use crate::config::{BreachwatchConfig, ChecksConfig};
use crate::errors::BreachwatchError;
use crate::reporting::formatter::format_check_summary;
use crate::reporting::{write_report, SecurityReport};

/// Folds command-line flags over the configured check settings.
pub fn merge_args(mut checks: ChecksConfig, args: &CheckArgs) -> ChecksConfig {
    if let Some(dir) = &args.project_dir {
        checks.project_dir = dir.clone();
    }
    if args.audit_report.is_some() {
        checks.audit_report = args.audit_report.clone();
    }
    if !args.images.is_empty() {
        checks.images = args.images.clone();
    }
    if let Some(dir) = &args.source_dir {
        checks.source_dir = dir.clone();
    }
    checks.exclude.extend(args.exclude.iter().cloned());
    if args.header_url.is_some() {
        checks.header_url = args.header_url.clone();
    }
    if let Some(dir) = &args.output {
        checks.output_dir = dir.clone();
    }
    if let Some(max) = args.max_critical {
        checks.max_critical = max;
    }
    if let Some(max) = args.max_high {
        checks.max_high = max;
    }
    checks
}

/// Runs every check, writes the report and returns the process exit code.
pub async fn handle_check(args: CheckArgs, config: BreachwatchConfig) -> Result<i32, BreachwatchError> {
    let checks = merge_args(config.checks, &args);
    let runner = CheckRunner::from_config(&checks)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcomes = runner.run(|name| spinner.set_message(format!("Running {}...", name))).await;
    spinner.finish_and_clear();

    let report = SecurityReport::assemble(outcomes, ExitPolicy::from(&checks));
    let (html, json) = write_report(&report, &PathBuf::from(&checks.output_dir)).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", style("Security check").bold());
        print!("{}", format_check_summary(&report));
        println!("\n  Report: {}", html.display());
        println!("  JSON:   {}", json.display());
    }

    Ok(report.exit_code)
}
