use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BreachwatchConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub breach: BreachConfig,
    pub checks: ChecksConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "data/breachwatch.db".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8700,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreachConfig {
    pub default_deadline_hours: u32,
}

impl Default for BreachConfig {
    fn default() -> Self {
        Self { default_deadline_hours: crate::tracking::DEFAULT_DEADLINE_HOURS }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Directory holding `package.json` for the dependency audit.
    pub project_dir: String,
    /// Pre-generated `npm audit --json` output, read instead of running npm.
    pub audit_report: Option<String>,
    pub images: Vec<String>,
    pub source_dir: String,
    /// Glob patterns, relative to `source_dir`, skipped by the secret scan.
    pub exclude: Vec<String>,
    pub header_url: Option<String>,
    pub timeout_secs: u64,
    pub max_critical: u64,
    pub max_high: u64,
    pub output_dir: String,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            project_dir: ".".to_string(),
            audit_report: None,
            images: Vec::new(),
            source_dir: ".".to_string(),
            exclude: Vec::new(),
            header_url: None,
            timeout_secs: 10,
            max_critical: 0,
            max_high: 5,
            output_dir: "reports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { directory: "exports".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reproduce_exit_contract() {
        let config = BreachwatchConfig::default();
        assert_eq!(config.checks.max_critical, 0);
        assert_eq!(config.checks.max_high, 5);
        assert_eq!(config.breach.default_deadline_hours, 72);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: BreachwatchConfig = serde_yaml::from_str("checks:\n  max_high: 10\n").unwrap();
        assert_eq!(config.checks.max_high, 10);
        assert_eq!(config.checks.timeout_secs, 10);
        assert_eq!(config.server.port, 8700);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config: BreachwatchConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.database.path, "data/breachwatch.db");
        assert!(config.checks.images.is_empty());
    }
}
