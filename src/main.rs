use std::path::{Path, PathBuf};

use breachwatch::cli::{self, Commands};
use breachwatch::config::{self, BreachwatchConfig};
use breachwatch::errors::BreachwatchError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .with_writer(std::io::stderr)
            .init();
    }
    if cli.no_color {
        console::set_colors_enabled(false);
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.classify().exit_code);
        }
    }
}

async fn run(cli: cli::Cli) -> Result<i32, BreachwatchError> {
    if let Commands::Validate(args) = &cli.command {
        return handle_validate(&args.config).await.map(|_| 0);
    }

    let mut config: BreachwatchConfig = config::load_config(cli.config.as_deref().map(Path::new)).await?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    match cli.command {
        Commands::Serve(args) => cli::serve::handle_serve(args, config).await.map(|_| 0),
        Commands::Check(args) => cli::check::handle_check(args, config).await,
        Commands::Incident(command) => cli::incident::handle_incident(command, &config).map(|_| 0),
        Commands::Type(command) => cli::incident::handle_type(command, &config).map(|_| 0),
        Commands::Notify(command) => cli::notify::handle_notify(command, &config).map(|_| 0),
        Commands::Activity(command) => cli::activity::handle_activity(command, &config).map(|_| 0),
        Commands::Overdue(args) => cli::incident::handle_overdue(args, &config).map(|_| 0),
        Commands::Stats(args) => cli::incident::handle_stats(args, &config).map(|_| 0),
        Commands::Export(args) => cli::export::handle_export(args, &config).await.map(|_| 0),
        Commands::Validate(_) => Ok(0),
    }
}

async fn handle_validate(path: &str) -> Result<(), BreachwatchError> {
    let path = PathBuf::from(path);
    let _config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", path.display());
    Ok(())
}
