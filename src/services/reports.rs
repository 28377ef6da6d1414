//! Report query service
//!
//! Two read paths over the same data: `live` aggregates the raw
//! transaction collection on demand, `materialized` reads the summary
//! collection the materializer maintains.

use crate::calendar;
use crate::store::{Pipeline, SummaryStore, TransactionStore};
use crate::types::{Granularity, MerchantId, MetricType, ReportRow, Result};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReportService {
    transactions: Arc<dyn TransactionStore>,
    summaries: Arc<dyn SummaryStore>,
}

impl ReportService {
    pub fn new(transactions: Arc<dyn TransactionStore>, summaries: Arc<dyn SummaryStore>) -> Self {
        ReportService {
            transactions,
            summaries,
        }
    }

    /// Ad-hoc report over raw transactions.
    ///
    /// Groups that resolve to the same period key are merged by summing:
    /// weekly resolution folds several storage-calendar groups into one
    /// Jalali week. Output keeps the insertion order of each key's first
    /// occurrence; it is deliberately not re-sorted after the merge.
    ///
    /// A group that cannot be resolved fails the whole request, unlike the
    /// materializer's skip-and-continue policy.
    pub fn live(
        &self,
        granularity: Granularity,
        metric: MetricType,
        merchant: Option<&MerchantId>,
    ) -> Result<Vec<ReportRow>> {
        let pipeline = Pipeline::build(granularity, metric, merchant);
        let groups = self.transactions.aggregate(&pipeline)?;

        let mut order: Vec<String> = Vec::new();
        let mut merged: HashMap<String, f64> = HashMap::new();
        for group in groups {
            let date = calendar::representative_date(granularity, &group.key)?;
            let key = calendar::period_key(date, granularity)?;
            match merged.entry(key) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    *entry.get_mut() += group.value;
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    order.push(entry.key().clone());
                    entry.insert(group.value);
                }
            }
        }

        Ok(order
            .into_iter()
            .map(|key| {
                let value = merged.remove(&key).unwrap_or(0.0);
                ReportRow { key, value }
            })
            .collect())
    }

    /// Pre-materialized report, sorted by period key ascending.
    pub fn materialized(
        &self,
        granularity: Granularity,
        metric: MetricType,
        merchant: Option<&MerchantId>,
    ) -> Result<Vec<ReportRow>> {
        self.summaries.query(granularity, metric, merchant)
    }
}
