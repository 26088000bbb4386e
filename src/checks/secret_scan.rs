use std::fs::DirEntry;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::errors::BreachwatchError;
use super::{CheckCounters, CheckOutcome, SecretMatch, SecurityCheck};

pub const NAME: &str = "secret_scan";

const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target", "dist", "build", "vendor"];
const MAX_FILE_SIZE: u64 = 1_048_576;

const PATTERNS: &[(&str, &str)] = &[
    ("aws_access_key_id", r"AKIA[0-9A-Z]{16}"),
    ("private_key", r"-----BEGIN (?:RSA |EC |DSA |OPENSSH |PGP )?PRIVATE KEY"),
    ("github_token", r"gh[pousr]_[A-Za-z0-9]{36}"),
    ("slack_token", r"xox[abprs]-[A-Za-z0-9-]{10,}"),
    ("google_api_key", r"AIza[0-9A-Za-z_\-]{35}"),
    ("stripe_live_key", r"sk_live_[0-9a-zA-Z]{24,}"),
    ("jwt", r"eyJ[A-Za-z0-9_-]{10,}\.eyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}"),
    ("generic_secret_assignment", r#"(?i)(?:api[_-]?key|secret|passwd|password|token)\s*[:=]\s*["'][^"'\s]{8,}["']"#),
];

/// Regex sweep over a source tree. Each pattern is reported once, at the
/// first file (in sorted walk order) where it matched.
#[derive(Clone)]
pub struct SecretScan {
    root: PathBuf,
    exclude: Vec<glob::Pattern>,
    patterns: Vec<(&'static str, Regex)>,
}

impl SecretScan {
    pub fn new(root: impl Into<PathBuf>, exclude: &[String]) -> Result<Self, BreachwatchError> {
        let exclude = exclude
            .iter()
            .map(|p| glob::Pattern::new(p)
                .map_err(|e| BreachwatchError::Config(format!("Invalid exclude pattern '{}': {}", p, e))))
            .collect::<Result<Vec<_>, _>>()?;
        let patterns = PATTERNS
            .iter()
            .map(|(name, re)| Regex::new(re)
                .map(|compiled| (*name, compiled))
                .map_err(|e| BreachwatchError::Internal(format!("Bad secret pattern {}: {}", name, e))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { root: root.into(), exclude, patterns })
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.exclude.iter().any(|p| p.matches_path(relative))
    }

    fn sorted_entries(dir: &Path) -> std::io::Result<Vec<DirEntry>> {
        let mut entries: Vec<DirEntry> = std::fs::read_dir(dir)?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Unreadable entry skipped");
                    None
                }
            })
            .collect();
        entries.sort_by_key(|e| e.file_name());
        Ok(entries)
    }

    /// Collects candidate files below `dir`. Unreadable subdirectories and
    /// entries are logged and skipped so one bad path cannot hide the rest.
    fn walk_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        match Self::sorted_entries(dir) {
            Ok(entries) => self.walk_entries(entries, files),
            Err(e) => warn!(dir = %dir.display(), error = %e, "Unreadable directory skipped"),
        }
    }

    fn walk_entries(&self, entries: Vec<DirEntry>, files: &mut Vec<PathBuf>) {
        for entry in entries {
            let path = entry.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            let relative = path.strip_prefix(&self.root).unwrap_or(&path);

            if SKIP_DIRS.contains(&name) || self.is_excluded(relative) { continue; }

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Entry vanished during walk");
                    continue;
                }
            };
            if file_type.is_dir() {
                self.walk_dir(&path, files);
            } else if file_type.is_file() {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                if size <= MAX_FILE_SIZE {
                    files.push(path);
                }
            }
        }
    }

    pub fn scan(&self) -> Result<Vec<SecretMatch>, BreachwatchError> {
        // Only an unreadable root fails the scan.
        let top = Self::sorted_entries(&self.root)?;
        let mut files = Vec::new();
        self.walk_entries(top, &mut files);

        let mut matches: Vec<SecretMatch> = Vec::new();
        for file in &files {
            if matches.len() == self.patterns.len() { break; }

            let content = match std::fs::read(file) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                Err(e) => {
                    debug!(file = %file.display(), error = %e, "Unreadable file skipped");
                    continue;
                }
            };

            for (name, re) in &self.patterns {
                if matches.iter().any(|m| m.pattern == *name) { continue; }
                if let Some(found) = re.find(&content) {
                    let line = content[..found.start()].matches('\n').count() + 1;
                    let relative = file.strip_prefix(&self.root).unwrap_or(file);
                    matches.push(SecretMatch {
                        pattern: name.to_string(),
                        file: relative.display().to_string(),
                        line,
                    });
                }
            }
        }

        info!(files = files.len(), patterns_matched = matches.len(), "Secret scan finished");
        Ok(matches)
    }
}

#[async_trait]
impl SecurityCheck for SecretScan {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> CheckOutcome {
        if !self.root.is_dir() {
            return CheckOutcome::skipped(NAME, format!("source directory {} not found", self.root.display()));
        }
        let scanner = self.clone();
        let result = match tokio::task::spawn_blocking(move || scanner.scan()).await {
            Ok(result) => result,
            Err(e) => return CheckOutcome::failed(NAME, format!("secret scan task aborted: {}", e)),
        };
        match result {
            Ok(found) => {
                let mut outcome = CheckOutcome::completed(NAME, CheckCounters {
                    secrets: found.len() as u64,
                    ..Default::default()
                });
                outcome.secret_matches = found;
                outcome
            }
            Err(e) => CheckOutcome::failed(NAME, e.to_string()),
        }
    }
}
