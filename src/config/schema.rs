use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "database": {
                "type": "object",
                "properties": {
                    "path": { "type": "string", "minLength": 1 }
                }
            },
            "server": {
                "type": "object",
                "properties": {
                    "host": { "type": "string" },
                    "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                    "cors_origins": { "type": "array", "items": { "type": "string" } }
                }
            },
            "breach": {
                "type": "object",
                "properties": {
                    "default_deadline_hours": { "type": "integer", "minimum": 1, "maximum": 87600 }
                }
            },
            "checks": {
                "type": "object",
                "properties": {
                    "project_dir": { "type": "string" },
                    "audit_report": { "type": "string" },
                    "images": { "type": "array", "items": { "type": "string" } },
                    "source_dir": { "type": "string" },
                    "exclude": { "type": "array", "items": { "type": "string" } },
                    "header_url": { "type": "string", "format": "uri" },
                    "timeout_secs": { "type": "integer", "minimum": 1 },
                    "max_critical": { "type": "integer", "minimum": 0 },
                    "max_high": { "type": "integer", "minimum": 0 },
                    "output_dir": { "type": "string" }
                }
            },
            "export": {
                "type": "object",
                "properties": {
                    "directory": { "type": "string" }
                }
            }
        }
    })
});
