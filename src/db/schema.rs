pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS incident_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    severity_level INTEGER NOT NULL DEFAULT 2 CHECK (severity_level BETWEEN 1 AND 4),
    notification_deadline_hours INTEGER CHECK (notification_deadline_hours IS NULL OR notification_deadline_hours > 0),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS incidents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    incident_number TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    description TEXT,
    incident_type_id INTEGER REFERENCES incident_types(id) ON DELETE SET NULL,
    status TEXT NOT NULL DEFAULT 'open'
        CHECK (status IN ('open', 'investigating', 'contained', 'resolved', 'closed')),
    severity TEXT NOT NULL DEFAULT 'medium'
        CHECK (severity IN ('critical', 'high', 'medium', 'low')),
    reported_by TEXT,
    assigned_to TEXT,
    detected_at TEXT NOT NULL,
    contained_at TEXT,
    resolved_at TEXT,
    closed_at TEXT,
    is_data_breach INTEGER NOT NULL DEFAULT 0,
    affected_records INTEGER NOT NULL DEFAULT 0,
    requires_notification INTEGER NOT NULL DEFAULT 0,
    notification_deadline TEXT,
    notification_sent_at TEXT,
    notification_completed INTEGER NOT NULL DEFAULT 0,
    root_cause TEXT,
    remediation TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS incident_activities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    incident_id INTEGER NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
    action_type TEXT NOT NULL,
    description TEXT,
    old_value TEXT,
    new_value TEXT,
    performed_by TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS incident_notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    incident_id INTEGER NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
    recipient_type TEXT NOT NULL,
    recipient TEXT NOT NULL,
    channel TEXT NOT NULL,
    subject TEXT,
    message TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'sent', 'failed', 'acknowledged')),
    sent_at TEXT,
    acknowledged_at TEXT,
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status);
CREATE INDEX IF NOT EXISTS idx_incidents_severity ON incidents(severity);
CREATE INDEX IF NOT EXISTS idx_incidents_detected_at ON incidents(detected_at);
CREATE INDEX IF NOT EXISTS idx_incidents_notification_deadline ON incidents(notification_deadline);
CREATE INDEX IF NOT EXISTS idx_incident_activities_incident ON incident_activities(incident_id);
CREATE INDEX IF NOT EXISTS idx_incident_activities_created ON incident_activities(created_at);
CREATE INDEX IF NOT EXISTS idx_incident_notifications_incident ON incident_notifications(incident_id);
CREATE INDEX IF NOT EXISTS idx_incident_notifications_status ON incident_notifications(status);
";

pub const SEED_INCIDENT_TYPES: &str = "
INSERT OR IGNORE INTO incident_types (name, description, severity_level, notification_deadline_hours, created_at) VALUES
    ('data_breach', 'Unauthorized disclosure of personal data', 1, 72, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    ('ransomware', 'Data encrypted or exfiltrated for extortion', 1, 72, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    ('unauthorized_access', 'Access to systems or data without authorization', 2, 72, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    ('malware', 'Malicious software detected on a managed asset', 2, NULL, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    ('denial_of_service', 'Service availability degraded by an attack', 2, NULL, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    ('phishing', 'Credential or payload delivery through deceptive messages', 3, NULL, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    ('policy_violation', 'Internal security policy breach without external impact', 4, NULL, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'));
";
