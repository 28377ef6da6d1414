//! Summary materializer
//!
//! Batch job that rolls raw transactions up into the summary collection.
//! Upserts are idempotent: re-running over unchanged data rewrites the
//! same records with the same values.

use crate::calendar;
use crate::store::{Pipeline, SummaryStore, TransactionStore};
use crate::types::{Granularity, MerchantId, MetricType, Result, SummaryRecord};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Materializer {
    transactions: Arc<dyn TransactionStore>,
    summaries: Arc<dyn SummaryStore>,
}

impl Materializer {
    pub fn new(transactions: Arc<dyn TransactionStore>, summaries: Arc<dyn SummaryStore>) -> Self {
        Materializer {
            transactions,
            summaries,
        }
    }

    /// Materialize one `(granularity, metric, merchant?)` combination.
    ///
    /// A group whose date parts cannot be resolved is logged and skipped;
    /// the rest of the batch continues. Returns the number of records
    /// upserted.
    pub fn materialize(
        &self,
        granularity: Granularity,
        metric: MetricType,
        merchant: Option<&MerchantId>,
    ) -> Result<usize> {
        let pipeline = Pipeline::build(granularity, metric, merchant);
        let groups = self.transactions.aggregate(&pipeline)?;
        let mut upserted = 0usize;

        for group in groups {
            let date = match calendar::representative_date(granularity, &group.key) {
                Ok(date) => date,
                Err(err) => {
                    warn!(%granularity, %metric, %err, "skipping unresolvable group");
                    continue;
                }
            };
            let key = match calendar::period_key(date, granularity) {
                Ok(key) => key,
                Err(err) => {
                    warn!(%granularity, %metric, %err, "skipping unresolvable group");
                    continue;
                }
            };
            self.summaries.upsert(SummaryRecord {
                granularity,
                metric,
                key,
                merchant: merchant.cloned(),
                value: group.value,
            })?;
            upserted += 1;
        }

        Ok(upserted)
    }

    /// Run the materializer over a selection of combinations.
    ///
    /// Omitting `mode` or `metric` expands to all values of that selector;
    /// omitting both runs the full cross-product. Combinations run and
    /// fail independently. An invalid merchant id in this batch path is
    /// logged and the run is skipped, never surfaced as an error.
    pub fn run(
        &self,
        mode: Option<Granularity>,
        metric: Option<MetricType>,
        merchant_raw: Option<&str>,
    ) -> Result<()> {
        let merchant = match merchant_raw {
            Some(raw) => match raw.parse::<MerchantId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(merchant_id = raw, "Invalid merchantId, skipping summary run");
                    return Ok(());
                }
            },
            None => None,
        };

        let modes: Vec<Granularity> = match mode {
            Some(g) => vec![g],
            None => Granularity::ALL.to_vec(),
        };
        let metrics: Vec<MetricType> = match metric {
            Some(m) => vec![m],
            None => MetricType::ALL.to_vec(),
        };

        for g in &modes {
            for m in &metrics {
                match self.materialize(*g, *m, merchant.as_ref()) {
                    Ok(upserted) => {
                        info!(granularity = %g, metric = %m, upserted, "summary updated");
                    }
                    Err(err) => {
                        warn!(granularity = %g, metric = %m, %err, "summary update failed");
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::Transaction;
    use chrono::{TimeZone, Utc};

    fn merchant() -> MerchantId {
        "65a9c2f1e4b0a1b2c3d4e5f6".parse().unwrap()
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (id, amount, day) in [("t1", 10.0, 20), ("t2", 5.0, 20), ("t3", 2.5, 21)] {
            store
                .insert(Transaction {
                    id: id.into(),
                    merchant_id: merchant(),
                    amount,
                    created_at: Some(Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap()),
                })
                .unwrap();
        }
        store
    }

    fn materializer(store: Arc<MemoryStore>) -> Materializer {
        Materializer::new(store.clone(), store)
    }

    #[test]
    fn test_materialize_daily_amount() {
        let store = seeded();
        let upserted = materializer(store.clone())
            .materialize(Granularity::Daily, MetricType::Amount, None)
            .unwrap();
        assert_eq!(upserted, 2);
        let rows = store
            .query(Granularity::Daily, MetricType::Amount, None)
            .unwrap();
        assert_eq!(rows[0].key, "1403/01/01");
        assert_eq!(rows[0].value, 15.0);
        assert_eq!(rows[1].key, "1403/01/02");
        assert_eq!(rows[1].value, 2.5);
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let store = seeded();
        let m = materializer(store.clone());
        m.materialize(Granularity::Daily, MetricType::Count, None)
            .unwrap();
        let first = store
            .query(Granularity::Daily, MetricType::Count, None)
            .unwrap();
        m.materialize(Granularity::Daily, MetricType::Count, None)
            .unwrap();
        let second = store
            .query(Granularity::Daily, MetricType::Count, None)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_materialize_scoped_to_merchant() {
        let store = seeded();
        let other: MerchantId = "ffffffffffffffffffffffff".parse().unwrap();
        store
            .insert(Transaction {
                id: "x1".into(),
                merchant_id: other.clone(),
                amount: 100.0,
                created_at: Some(Utc.with_ymd_and_hms(2024, 3, 20, 8, 0, 0).unwrap()),
            })
            .unwrap();
        let id = merchant();
        materializer(store.clone())
            .materialize(Granularity::Daily, MetricType::Amount, Some(&id))
            .unwrap();
        let rows = store
            .query(Granularity::Daily, MetricType::Amount, Some(&id))
            .unwrap();
        assert_eq!(rows[0].value, 15.0);
        // nothing written under the unfiltered identity
        assert!(store
            .query(Granularity::Daily, MetricType::Amount, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_run_full_cross_product() {
        let store = seeded();
        materializer(store.clone()).run(None, None, None).unwrap();
        for g in Granularity::ALL {
            for m in MetricType::ALL {
                assert!(
                    !store.query(g, m, None).unwrap().is_empty(),
                    "missing summaries for {g}/{m}"
                );
            }
        }
    }

    #[test]
    fn test_run_single_selector_expands_other_axis() {
        let store = seeded();
        materializer(store.clone())
            .run(Some(Granularity::Daily), None, None)
            .unwrap();
        assert!(!store
            .query(Granularity::Daily, MetricType::Count, None)
            .unwrap()
            .is_empty());
        assert!(!store
            .query(Granularity::Daily, MetricType::Amount, None)
            .unwrap()
            .is_empty());
        assert!(store
            .query(Granularity::Weekly, MetricType::Count, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_run_invalid_merchant_id_skips_without_error() {
        let store = seeded();
        materializer(store.clone())
            .run(None, None, Some("not-an-id"))
            .unwrap();
        assert!(store
            .query(Granularity::Daily, MetricType::Count, None)
            .unwrap()
            .is_empty());
    }
}
