//! Aggregation pipeline construction
//!
//! Queries against the transaction collection are expressed as explicit
//! stage lists, mirroring the document store's aggregation pipelines. The
//! store interprets the stages; callers only ever build them here.

use crate::calendar;
use crate::types::{Granularity, MerchantId, MetricType};
use chrono::Datelike;

/// Group identity for one aggregation bucket, in storage-calendar parts.
///
/// Which parts are populated depends on the granularity: `(year, month,
/// day)` daily, `(year, week)` weekly, `(year, month)` monthly. Ordering
/// is derived field order, which is calendar-monotonic within any one
/// granularity's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub week: Option<u32>,
}

impl GroupKey {
    /// Group key of a storage-calendar date under `granularity`.
    pub fn for_date(date: chrono::NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Daily => GroupKey {
                year: date.year(),
                month: Some(date.month()),
                day: Some(date.day()),
                week: None,
            },
            Granularity::Weekly => GroupKey {
                year: date.year(),
                month: None,
                day: None,
                week: Some(calendar::storage_week(date)),
            },
            Granularity::Monthly => GroupKey {
                year: date.year(),
                month: Some(date.month()),
                day: None,
                week: None,
            },
        }
    }
}

/// One aggregated bucket: group identity plus the summed metric.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: GroupKey,
    pub value: f64,
}

/// A single pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep only documents belonging to one merchant
    MatchMerchant(MerchantId),
    /// Drop documents with a missing/null timestamp
    MatchTimestamped,
    /// Bucket by granularity's date parts and sum the metric
    Group {
        granularity: Granularity,
        metric: MetricType,
    },
    /// Order buckets by group key ascending
    SortAscending,
}

/// An aggregation pipeline over the raw transaction collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Build the report pipeline for a `(granularity, metric, merchant?)`
    /// triple. Merchant validation happens before this point: callers hold
    /// an already-parsed [`MerchantId`].
    pub fn build(
        granularity: Granularity,
        metric: MetricType,
        merchant: Option<&MerchantId>,
    ) -> Self {
        let mut stages = Vec::with_capacity(4);
        if let Some(id) = merchant {
            stages.push(Stage::MatchMerchant(id.clone()));
        }
        stages.push(Stage::MatchTimestamped);
        stages.push(Stage::Group {
            granularity,
            metric,
        });
        stages.push(Stage::SortAscending);
        Pipeline { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn merchant() -> MerchantId {
        "65a9c2f1e4b0a1b2c3d4e5f6".parse().unwrap()
    }

    #[test]
    fn test_build_without_merchant_filter() {
        let pipeline = Pipeline::build(Granularity::Daily, MetricType::Count, None);
        assert_eq!(
            pipeline.stages(),
            &[
                Stage::MatchTimestamped,
                Stage::Group {
                    granularity: Granularity::Daily,
                    metric: MetricType::Count
                },
                Stage::SortAscending,
            ]
        );
    }

    #[test]
    fn test_build_with_merchant_filter_first() {
        let pipeline = Pipeline::build(Granularity::Weekly, MetricType::Amount, Some(&merchant()));
        assert_eq!(pipeline.stages()[0], Stage::MatchMerchant(merchant()));
        assert_eq!(pipeline.stages().len(), 4);
    }

    #[test]
    fn test_group_key_shapes() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let daily = GroupKey::for_date(date, Granularity::Daily);
        assert_eq!((daily.year, daily.month, daily.day, daily.week), (2024, Some(3), Some(20), None));

        let weekly = GroupKey::for_date(date, Granularity::Weekly);
        assert_eq!(weekly.month, None);
        assert_eq!(weekly.week, Some(calendar::storage_week(date)));

        let monthly = GroupKey::for_date(date, Granularity::Monthly);
        assert_eq!((monthly.month, monthly.day), (Some(3), None));
    }

    #[test]
    fn test_group_key_ordering_is_calendar_monotonic() {
        let jan = GroupKey::for_date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), Granularity::Daily);
        let mar = GroupKey::for_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), Granularity::Daily);
        let next_year = GroupKey::for_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), Granularity::Daily);
        assert!(jan < mar);
        assert!(mar < next_year);
    }
}
