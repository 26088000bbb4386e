use serde::{Deserialize, Serialize};
use super::CheckCounters;
use crate::config::ChecksConfig;

/// Finding thresholds above which the check run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPolicy {
    pub max_critical: u64,
    pub max_high: u64,
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self { max_critical: 0, max_high: 5 }
    }
}

impl From<&ChecksConfig> for ExitPolicy {
    fn from(config: &ChecksConfig) -> Self {
        Self {
            max_critical: config.max_critical,
            max_high: config.max_high,
        }
    }
}

/// Medium findings and secrets are reported but never fail the run.
pub fn exit_code(counters: &CheckCounters, policy: &ExitPolicy) -> i32 {
    if counters.critical > policy.max_critical || counters.high > policy.max_high {
        1
    } else {
        0
    }
}
