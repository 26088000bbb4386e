use std::path::Path;
use crate::errors::BreachwatchError;
use super::types::BreachwatchConfig;
use super::security::validate_security_patterns;
use super::schema::CONFIG_SCHEMA;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "breachwatch.yaml";
pub const ENV_DB: &str = "BREACHWATCH_DB";
pub const ENV_HEADER_URL: &str = "BREACHWATCH_HEADER_URL";

pub async fn parse_config(path: &Path) -> Result<BreachwatchConfig, BreachwatchError> {
    if !path.exists() {
        return Err(BreachwatchError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(BreachwatchError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<BreachwatchConfig, BreachwatchError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    // An empty file parses as null.
    let yaml = if yaml.is_null() {
        serde_yaml::Value::Mapping(Default::default())
    } else {
        yaml
    };

    validate_security_patterns(&yaml)?;
    validate_schema(&yaml)?;

    let config: BreachwatchConfig = serde_yaml::from_value(yaml)?;
    validate_conflicts(&config)?;
    Ok(config)
}

/// Explicit path must exist; otherwise `breachwatch.yaml` is used when
/// present, defaults when not. Environment overrides are applied last.
pub async fn load_config(path: Option<&Path>) -> Result<BreachwatchConfig, BreachwatchError> {
    let mut config = match path {
        Some(p) => parse_config(p).await?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                parse_config(default_path).await?
            } else {
                debug!("No config file, using defaults");
                BreachwatchConfig::default()
            }
        }
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn apply_env_overrides<F>(config: &mut BreachwatchConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(db) = lookup(ENV_DB).filter(|v| !v.trim().is_empty()) {
        config.database.path = db;
    }
    if let Some(url) = lookup(ENV_HEADER_URL).filter(|v| !v.trim().is_empty()) {
        config.checks.header_url = Some(url);
    }
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), BreachwatchError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| BreachwatchError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| BreachwatchError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        // Advisory: typed parsing below is the hard gate.
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Detect semantic conflicts in the parsed configuration.
fn validate_conflicts(config: &BreachwatchConfig) -> Result<(), BreachwatchError> {
    crate::models::validate_deadline_hours("breach.default_deadline_hours", config.breach.default_deadline_hours)
        .map_err(|e| BreachwatchError::Config(e.to_string()))?;
    if config.server.port == 0 {
        return Err(BreachwatchError::Config("server.port must not be 0".into()));
    }
    if config.checks.timeout_secs == 0 {
        return Err(BreachwatchError::Config("checks.timeout_secs must be positive".into()));
    }
    for pattern in &config.checks.exclude {
        glob::Pattern::new(pattern)
            .map_err(|e| BreachwatchError::Config(format!("Invalid exclude pattern '{}': {}", pattern, e)))?;
    }
    if config.checks.images.is_empty() {
        debug!("No images configured, image scan will be skipped");
    }
    Ok(())
}
