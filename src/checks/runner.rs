use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::ChecksConfig;
use crate::errors::BreachwatchError;
use super::dependency_audit::DependencyAudit;
use super::header_check::HeaderCheck;
use super::image_scan::ImageScan;
use super::secret_scan::SecretScan;
use super::{CheckCounters, CheckOutcome, SecurityCheck};

/// Runs checks one after another in registration order.
pub struct CheckRunner {
    checks: Vec<Box<dyn SecurityCheck>>,
}

impl CheckRunner {
    pub fn new(checks: Vec<Box<dyn SecurityCheck>>) -> Self {
        Self { checks }
    }

    pub fn from_config(config: &ChecksConfig) -> Result<Self, BreachwatchError> {
        let checks: Vec<Box<dyn SecurityCheck>> = vec![
            Box::new(DependencyAudit::new(
                &config.project_dir,
                config.audit_report.as_ref().map(PathBuf::from),
            )),
            Box::new(ImageScan::new(config.images.clone())),
            Box::new(SecretScan::new(&config.source_dir, &config.exclude)?),
            Box::new(HeaderCheck::new(
                config.header_url.clone(),
                Duration::from_secs(config.timeout_secs),
            )),
        ];
        Ok(Self::new(checks))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// `on_start` is called with each check name before it runs.
    pub async fn run<F>(&self, on_start: F) -> Vec<CheckOutcome>
    where
        F: Fn(&str),
    {
        let mut outcomes = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            on_start(check.name());
            let started = Instant::now();
            let mut outcome = check.run().await;
            outcome.duration_ms = started.elapsed().as_millis() as u64;
            info!(
                check = check.name(),
                status = outcome.status.label(),
                duration_ms = outcome.duration_ms,
                "Check finished"
            );
            outcomes.push(outcome);
        }
        outcomes
    }
}

pub fn total_counters(outcomes: &[CheckOutcome]) -> CheckCounters {
    outcomes.iter().fold(CheckCounters::default(), |mut acc, o| {
        acc.add(&o.counters);
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Fixed(&'static str, CheckCounters);

    #[async_trait]
    impl SecurityCheck for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn run(&self) -> CheckOutcome {
            CheckOutcome::completed(self.0, self.1)
        }
    }

    #[tokio::test]
    async fn test_runs_in_order_and_sums() {
        let runner = CheckRunner::new(vec![
            Box::new(Fixed("first", CheckCounters { critical: 1, ..Default::default() })),
            Box::new(Fixed("second", CheckCounters { high: 2, secrets: 1, ..Default::default() })),
        ]);
        let seen = Mutex::new(Vec::new());
        let outcomes = runner.run(|name| seen.lock().unwrap().push(name.to_string())).await;

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            total_counters(&outcomes),
            CheckCounters { critical: 1, high: 2, medium: 0, secrets: 1 }
        );
    }

    #[test]
    fn test_from_config_registers_all_checks() {
        let runner = CheckRunner::from_config(&ChecksConfig::default()).unwrap();
        assert_eq!(runner.names(), vec!["dependency_audit", "image_scan", "secret_scan", "header_check"]);
    }

    #[test]
    fn test_from_config_rejects_bad_exclude() {
        let config = ChecksConfig { exclude: vec!["[".into()], ..Default::default() };
        assert!(CheckRunner::from_config(&config).is_err());
    }
}
