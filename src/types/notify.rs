//! Notification types: mediums, dispatch tasks, delivery audit records

use crate::types::{ReportError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Supported delivery channels.
///
/// A closed set: adding a channel means adding a variant and the match arms
/// stop compiling until every send path handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Email,
    Sms,
    Push,
    Telegram,
}

impl Medium {
    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Email => "email",
            Medium::Sms => "sms",
            Medium::Push => "push",
            Medium::Telegram => "telegram",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Medium {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "email" => Ok(Medium::Email),
            "sms" => Ok(Medium::Sms),
            "push" => Ok(Medium::Push),
            "telegram" => Ok(Medium::Telegram),
            other => Err(ReportError::UnsupportedMedium(other.to_string())),
        }
    }
}

/// Transient unit of dispatch work: one (medium, recipient) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTask {
    pub medium: Medium,
    pub recipient: String,
    pub message: String,
}

/// Outcome of a single delivery attempt, as recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Success,
    Timeout,
    Failed(String),
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Success => f.write_str("success"),
            DeliveryStatus::Timeout => f.write_str("timeout"),
            DeliveryStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Append-only audit record of one delivery attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAttempt {
    pub medium: Medium,
    pub recipient: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl DeliveryAttempt {
    /// Build an attempt record for `task` resolved with `status`, stamped now.
    pub fn record(task: &DispatchTask, status: &DeliveryStatus) -> Self {
        DeliveryAttempt {
            medium: task.medium,
            recipient: task.recipient.clone(),
            message: task.message.clone(),
            status: status.to_string(),
            created_at: Utc::now(),
        }
    }
}
