use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::errors::BreachwatchError;

/// Delivery state of a notification attempt. Any transition may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Acknowledged,
}

impl NotificationStatus {
    pub const ALL: [NotificationStatus; 4] = [Self::Pending, Self::Sent, Self::Failed, Self::Acknowledged];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Acknowledged => "acknowledged",
        }
    }

    /// Sent or acknowledged: the recipient was reached.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Sent | Self::Acknowledged)
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = BreachwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BreachwatchError::Validation(format!("unknown notification status '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    Regulator,
    DataSubjects,
    Internal,
    LawEnforcement,
    Other,
}

impl RecipientType {
    pub const ALL: [RecipientType; 5] = [
        Self::Regulator,
        Self::DataSubjects,
        Self::Internal,
        Self::LawEnforcement,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regulator => "regulator",
            Self::DataSubjects => "data_subjects",
            Self::Internal => "internal",
            Self::LawEnforcement => "law_enforcement",
            Self::Other => "other",
        }
    }
}

impl FromStr for RecipientType {
    type Err = BreachwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BreachwatchError::Validation(format!("unknown recipient type '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Letter,
    Phone,
    Portal,
    Webhook,
}

impl NotificationChannel {
    pub const ALL: [NotificationChannel; 5] = [
        Self::Email,
        Self::Letter,
        Self::Phone,
        Self::Portal,
        Self::Webhook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Letter => "letter",
            Self::Phone => "phone",
            Self::Portal => "portal",
            Self::Webhook => "webhook",
        }
    }
}

impl FromStr for NotificationChannel {
    type Err = BreachwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BreachwatchError::Validation(format!("unknown notification channel '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentNotification {
    pub id: i64,
    pub incident_id: i64,
    pub recipient_type: RecipientType,
    pub recipient: String,
    pub channel: NotificationChannel,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub recipient_type: RecipientType,
    pub recipient: String,
    pub channel: NotificationChannel,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl NewNotification {
    pub fn validate(&self) -> Result<(), BreachwatchError> {
        if self.recipient.trim().is_empty() {
            return Err(BreachwatchError::Validation("notification recipient must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("SENT".parse::<NotificationStatus>().unwrap(), NotificationStatus::Sent);
        assert!("bounced".parse::<NotificationStatus>().is_err());
    }

    #[test]
    fn test_delivered_states() {
        assert!(NotificationStatus::Sent.is_delivered());
        assert!(NotificationStatus::Acknowledged.is_delivered());
        assert!(!NotificationStatus::Failed.is_delivered());
        assert!(!NotificationStatus::Pending.is_delivered());
    }

    #[test]
    fn test_recipient_type_snake_case() {
        let json = serde_json::to_string(&RecipientType::DataSubjects).unwrap();
        assert_eq!(json, "\"data_subjects\"");
        assert_eq!("law_enforcement".parse::<RecipientType>().unwrap(), RecipientType::LawEnforcement);
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("Email".parse::<NotificationChannel>().unwrap(), NotificationChannel::Email);
        assert!("pigeon".parse::<NotificationChannel>().is_err());
    }

    #[test]
    fn test_blank_recipient_rejected() {
        let n = NewNotification {
            recipient_type: RecipientType::Regulator,
            recipient: " ".into(),
            channel: NotificationChannel::Portal,
            subject: None,
            message: None,
        };
        assert!(n.validate().is_err());
    }
}
