//! Report and transaction types

use crate::types::{ReportError, Result};
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Aggregation window for reports and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// All granularities, in materializer cross-product order
    pub const ALL: [Granularity; 3] =
        [Granularity::Daily, Granularity::Weekly, Granularity::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            _ => Err(ReportError::InvalidMode),
        }
    }
}

/// What gets summed per period: transaction count or transaction amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Count,
    Amount,
}

impl MetricType {
    /// All metric types, in materializer cross-product order
    pub const ALL: [MetricType; 2] = [MetricType::Count, MetricType::Amount];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Count => "count",
            MetricType::Amount => "amount",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "count" => Ok(MetricType::Count),
            "amount" => Ok(MetricType::Amount),
            _ => Err(ReportError::InvalidMetricType),
        }
    }
}

/// Validated merchant identifier (24 hex chars, object-id shape).
///
/// Stored lowercased so equality matches the store's canonical form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MerchantId(String);

impl MerchantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MerchantId {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(MerchantId(s.to_ascii_lowercase()))
        } else {
            Err(ReportError::InvalidMerchantId)
        }
    }
}

impl TryFrom<String> for MerchantId {
    type Error = ReportError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MerchantId> for String {
    fn from(id: MerchantId) -> String {
        id.0
    }
}

/// Immutable raw transaction record, the source of truth for all reports.
///
/// `created_at` is optional because upstream writers have produced records
/// without a timestamp; the aggregation pipeline filters those out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub merchant_id: MerchantId,
    pub amount: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One row of report output: a period key and its aggregated value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub key: String,
    pub value: f64,
}

impl Serialize for ReportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_struct("ReportRow", 2)?;
        row.serialize_field("key", &self.key)?;
        // Counts are integral sums; emit them without a fractional part
        if self.value.fract() == 0.0 && self.value.abs() < 9e15 {
            row.serialize_field("value", &(self.value as i64))?;
        } else {
            row.serialize_field("value", &self.value)?;
        }
        row.end()
    }
}

/// Format an aggregate value the way `ReportRow` serializes it.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Materialized summary document, upserted by the materializer.
///
/// At most one record exists per `(granularity, metric, key, merchant)`
/// tuple; re-running the materializer overwrites in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub granularity: Granularity,
    pub metric: MetricType,
    pub key: String,
    pub merchant: Option<MerchantId>,
    pub value: f64,
}
