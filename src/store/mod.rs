//! Document store abstraction
//!
//! The persistence engine is an external collaborator. These traits cover
//! the three collections the service touches: raw transactions (read via
//! aggregation pipelines), materialized summaries (upsert/query), and the
//! append-only delivery log. Handles are injected explicitly; there is no
//! process-wide connection.

mod memory;
mod pipeline;

pub use memory::MemoryStore;
pub use pipeline::{GroupKey, GroupRow, Pipeline, Stage};

use crate::types::{
    DeliveryAttempt, Granularity, MerchantId, MetricType, ReportRow, Result, SummaryRecord,
    Transaction,
};

/// Raw transaction collection with aggregation-pipeline queries.
pub trait TransactionStore: Send + Sync {
    /// Insert a raw transaction document.
    fn insert(&self, tx: Transaction) -> Result<()>;

    /// Run an aggregation pipeline, returning grouped buckets.
    fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<GroupRow>>;

    /// All merchant ids with at least one transaction.
    fn distinct_merchants(&self) -> Result<Vec<MerchantId>>;
}

/// Materialized summary collection.
pub trait SummaryStore: Send + Sync {
    /// Write a summary record, replacing any record with the same
    /// `(granularity, metric, key, merchant)` identity. Atomic per record.
    fn upsert(&self, record: SummaryRecord) -> Result<()>;

    /// Read summaries for one `(granularity, metric, merchant?)` selection,
    /// sorted by period key ascending.
    fn query(
        &self,
        granularity: Granularity,
        metric: MetricType,
        merchant: Option<&MerchantId>,
    ) -> Result<Vec<ReportRow>>;
}

/// Append-only delivery audit log. Infallible from the caller's view:
/// logging problems must never fail a delivery.
pub trait DeliveryLog: Send + Sync {
    fn append(&self, attempt: DeliveryAttempt);
}
