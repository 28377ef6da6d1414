use thiserror::Error;

/// txreport error types
#[derive(Error, Debug)]
pub enum ReportError {
    /// Unknown metric type (anything other than `count`/`amount`)
    #[error("Invalid type")]
    InvalidMetricType,

    /// Unknown granularity (anything other than `daily`/`weekly`/`monthly`)
    #[error("Invalid mode")]
    InvalidMode,

    /// Merchant id is not a well-formed object id
    #[error("Invalid merchantId")]
    InvalidMerchantId,

    /// Medium name outside the supported set
    #[error("Unsupported medium: {0}")]
    UnsupportedMedium(String),

    /// Aggregation group whose parts do not form a valid date
    #[error("malformed group: {0}")]
    MalformedGroup(String),

    /// Document store operation failed
    #[error("store error: {0}")]
    Store(String),

    /// Failed to parse a transaction record
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for txreport
pub type Result<T> = std::result::Result<T, ReportError>;
