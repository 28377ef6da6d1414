//! In-memory document store
//!
//! Process-local implementation of the store traits, used as the default
//! backing collection and as the test double. Transactions can be loaded
//! from a JSONL file, one document per line; malformed lines are skipped
//! with a warning rather than failing the load.

use crate::store::{DeliveryLog, GroupKey, GroupRow, Pipeline, Stage, SummaryStore, TransactionStore};
use crate::types::{
    DeliveryAttempt, Granularity, MerchantId, MetricType, ReportError, ReportRow, Result,
    SummaryRecord, Transaction,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, warn};

type SummaryKey = (Granularity, MetricType, String, Option<MerchantId>);

/// In-memory transaction collection, summary collection, and delivery log.
#[derive(Debug, Default)]
pub struct MemoryStore {
    transactions: RwLock<Vec<Transaction>>,
    summaries: RwLock<HashMap<SummaryKey, SummaryRecord>>,
    log: RwLock<Vec<DeliveryAttempt>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSONL file of transaction documents.
    pub fn load_jsonl(path: &Path) -> Result<Self> {
        let store = MemoryStore::new();
        let file = File::open(path)?;
        let mut loaded = 0usize;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Transaction>(&line) {
                Ok(tx) => {
                    store.insert(tx)?;
                    loaded += 1;
                }
                Err(err) => {
                    warn!(line = line_no + 1, %err, "skipping malformed transaction line");
                }
            }
        }
        debug!(loaded, path = %path.display(), "loaded transaction collection");
        Ok(store)
    }

    /// Snapshot of the delivery log, oldest first.
    pub fn delivery_attempts(&self) -> Vec<DeliveryAttempt> {
        self.log.read().map(|log| log.clone()).unwrap_or_default()
    }

    fn lock_poisoned() -> ReportError {
        ReportError::Store("store lock poisoned".into())
    }
}

impl TransactionStore for MemoryStore {
    fn insert(&self, tx: Transaction) -> Result<()> {
        self.transactions
            .write()
            .map_err(|_| Self::lock_poisoned())?
            .push(tx);
        Ok(())
    }

    fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<GroupRow>> {
        let transactions = self.transactions.read().map_err(|_| Self::lock_poisoned())?;
        let mut docs: Vec<&Transaction> = transactions.iter().collect();
        let mut rows: Vec<GroupRow> = Vec::new();

        for stage in pipeline.stages() {
            match stage {
                Stage::MatchMerchant(id) => docs.retain(|tx| &tx.merchant_id == id),
                Stage::MatchTimestamped => docs.retain(|tx| tx.created_at.is_some()),
                Stage::Group {
                    granularity,
                    metric,
                } => {
                    let mut buckets: BTreeMap<GroupKey, f64> = BTreeMap::new();
                    for tx in &docs {
                        let Some(created_at) = tx.created_at else {
                            continue;
                        };
                        let key = GroupKey::for_date(created_at.date_naive(), *granularity);
                        let increment = match metric {
                            MetricType::Count => 1.0,
                            MetricType::Amount => tx.amount,
                        };
                        *buckets.entry(key).or_insert(0.0) += increment;
                    }
                    rows = buckets
                        .into_iter()
                        .map(|(key, value)| GroupRow { key, value })
                        .collect();
                }
                Stage::SortAscending => rows.sort_by(|a, b| a.key.cmp(&b.key)),
            }
        }

        Ok(rows)
    }

    fn distinct_merchants(&self) -> Result<Vec<MerchantId>> {
        let transactions = self.transactions.read().map_err(|_| Self::lock_poisoned())?;
        let ids: BTreeSet<MerchantId> = transactions
            .iter()
            .map(|tx| tx.merchant_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }
}

impl SummaryStore for MemoryStore {
    fn upsert(&self, record: SummaryRecord) -> Result<()> {
        let key = (
            record.granularity,
            record.metric,
            record.key.clone(),
            record.merchant.clone(),
        );
        self.summaries
            .write()
            .map_err(|_| Self::lock_poisoned())?
            .insert(key, record);
        Ok(())
    }

    fn query(
        &self,
        granularity: Granularity,
        metric: MetricType,
        merchant: Option<&MerchantId>,
    ) -> Result<Vec<ReportRow>> {
        let summaries = self.summaries.read().map_err(|_| Self::lock_poisoned())?;
        let mut rows: Vec<ReportRow> = summaries
            .values()
            .filter(|record| {
                record.granularity == granularity
                    && record.metric == metric
                    && record.merchant.as_ref() == merchant
            })
            .map(|record| ReportRow {
                key: record.key.clone(),
                value: record.value,
            })
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }
}

impl DeliveryLog for MemoryStore {
    fn append(&self, attempt: DeliveryAttempt) {
        // The audit trail must never fail the delivery path; a poisoned
        // lock degrades to a warning.
        match self.log.write() {
            Ok(mut log) => {
                debug!(medium = %attempt.medium, recipient = %attempt.recipient,
                       status = %attempt.status, "delivery attempt logged");
                log.push(attempt);
            }
            Err(_) => warn!("delivery log unavailable, attempt dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeliveryStatus, DispatchTask, Medium};
    use chrono::{TimeZone, Utc};

    fn merchant(tag: u8) -> MerchantId {
        format!("65a9c2f1e4b0a1b2c3d4e5f{tag}").parse().unwrap()
    }

    fn tx(id: &str, merchant_id: MerchantId, amount: f64, day: u32) -> Transaction {
        Transaction {
            id: id.into(),
            merchant_id,
            amount,
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()),
        }
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(tx("t1", merchant(0), 10.0, 20)).unwrap();
        store.insert(tx("t2", merchant(0), 5.0, 20)).unwrap();
        store.insert(tx("t3", merchant(1), 7.5, 21)).unwrap();
        store
            .insert(Transaction {
                id: "t4".into(),
                merchant_id: merchant(1),
                amount: 99.0,
                created_at: None,
            })
            .unwrap();
        store
    }

    #[test]
    fn test_aggregate_daily_count() {
        let store = seeded();
        let pipeline = Pipeline::build(Granularity::Daily, MetricType::Count, None);
        let rows = store.aggregate(&pipeline).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, 2.0);
        assert_eq!(rows[1].value, 1.0);
    }

    #[test]
    fn test_aggregate_skips_untimestamped() {
        let store = seeded();
        let pipeline = Pipeline::build(Granularity::Monthly, MetricType::Amount, None);
        let rows = store.aggregate(&pipeline).unwrap();
        // t4 has no timestamp and its 99.0 never shows up
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 22.5);
    }

    #[test]
    fn test_aggregate_merchant_filter() {
        let store = seeded();
        let id = merchant(0);
        let pipeline = Pipeline::build(Granularity::Daily, MetricType::Amount, Some(&id));
        let rows = store.aggregate(&pipeline).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 15.0);
    }

    #[test]
    fn test_aggregate_sorted_ascending() {
        let store = MemoryStore::new();
        store.insert(tx("t1", merchant(0), 1.0, 25)).unwrap();
        store.insert(tx("t2", merchant(0), 1.0, 3)).unwrap();
        store.insert(tx("t3", merchant(0), 1.0, 14)).unwrap();
        let pipeline = Pipeline::build(Granularity::Daily, MetricType::Count, None);
        let rows = store.aggregate(&pipeline).unwrap();
        let days: Vec<u32> = rows.iter().filter_map(|r| r.key.day).collect();
        assert_eq!(days, vec![3, 14, 25]);
    }

    #[test]
    fn test_distinct_merchants() {
        let store = seeded();
        assert_eq!(store.distinct_merchants().unwrap().len(), 2);
    }

    #[test]
    fn test_upsert_is_last_writer_wins() {
        let store = MemoryStore::new();
        let record = SummaryRecord {
            granularity: Granularity::Daily,
            metric: MetricType::Count,
            key: "1403/01/01".into(),
            merchant: None,
            value: 3.0,
        };
        store.upsert(record.clone()).unwrap();
        store
            .upsert(SummaryRecord {
                value: 5.0,
                ..record
            })
            .unwrap();
        let rows = store
            .query(Granularity::Daily, MetricType::Count, None)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 5.0);
    }

    #[test]
    fn test_query_filters_merchant_and_sorts_by_key() {
        let store = MemoryStore::new();
        for (key, value, m) in [
            ("1403/01/02", 2.0, None),
            ("1403/01/01", 1.0, None),
            ("1403/01/03", 9.0, Some(merchant(0))),
        ] {
            store
                .upsert(SummaryRecord {
                    granularity: Granularity::Daily,
                    metric: MetricType::Count,
                    key: key.into(),
                    merchant: m,
                    value,
                })
                .unwrap();
        }
        let rows = store
            .query(Granularity::Daily, MetricType::Count, None)
            .unwrap();
        assert_eq!(
            rows.iter().map(|r| r.key.as_str()).collect::<Vec<_>>(),
            vec!["1403/01/01", "1403/01/02"]
        );
    }

    #[test]
    fn test_delivery_log_appends() {
        let store = MemoryStore::new();
        let task = DispatchTask {
            medium: Medium::Sms,
            recipient: "0902".into(),
            message: "hi".into(),
        };
        store.append(DeliveryAttempt::record(&task, &DeliveryStatus::Timeout));
        let attempts = store.delivery_attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, "timeout");
    }

    #[test]
    fn test_load_jsonl_skips_malformed_lines() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transactions.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"id":"t1","merchantId":"65a9c2f1e4b0a1b2c3d4e5f6","amount":10.0,"createdAt":"2024-03-20T12:00:00Z"}}"#
        )
        .unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(
            file,
            r#"{{"id":"t2","merchantId":"65a9c2f1e4b0a1b2c3d4e5f6","amount":4.0,"createdAt":"2024-03-20T13:00:00Z"}}"#
        )
        .unwrap();

        let store = MemoryStore::load_jsonl(&path).unwrap();
        let pipeline = Pipeline::build(Granularity::Daily, MetricType::Count, None);
        assert_eq!(store.aggregate(&pipeline).unwrap()[0].value, 2.0);
    }
}
