use crate::errors::BreachwatchError;

/// Config values end up inside the generated HTML report.
const DANGEROUS_PATTERNS: &[&str] = &[
    "<script",
    "</script",
    "javascript:",
    "vbscript:",
    "onerror=",
    "onload=",
];

pub fn validate_security_patterns(value: &serde_yaml::Value) -> Result<(), BreachwatchError> {
    check_value(value, &[])
}

fn check_value(value: &serde_yaml::Value, path: &[String]) -> Result<(), BreachwatchError> {
    match value {
        serde_yaml::Value::String(s) => {
            let lower = s.to_lowercase();
            if let Some(pattern) = DANGEROUS_PATTERNS.iter().find(|p| lower.contains(*p)) {
                let path_str = if path.is_empty() { "root".to_string() } else { path.join(".") };
                return Err(BreachwatchError::Config(
                    format!("Dangerous pattern '{}' found at config path: {}", pattern, path_str)
                ));
            }
            Ok(())
        }
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let mut new_path = path.to_vec();
                new_path.push(k.as_str().unwrap_or("unknown").to_string());
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        serde_yaml::Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                let mut new_path = path.to_vec();
                new_path.push(format!("[{}]", i));
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
