//! Period key resolution
//!
//! Transactions are stored with Gregorian timestamps but reported in the
//! Jalali calendar. This module owns both directions of that seam: turning
//! a storage-calendar date into a localized period key, and rebuilding a
//! representative storage date from aggregation group parts.

pub mod jalali;

use crate::store::GroupKey;
use crate::types::{Granularity, ReportError, Result};
use chrono::{Datelike, Days, NaiveDate};
use jalali::JalaliDate;

/// Resolve a storage-calendar date to its localized period key.
///
/// Deterministic and order-independent: two dates in the same Jalali
/// period always yield the same key.
pub fn period_key(date: NaiveDate, granularity: Granularity) -> Result<String> {
    let jalali = JalaliDate::from_gregorian(date)?;
    match granularity {
        Granularity::Daily => Ok(format!(
            "{:04}/{:02}/{:02}",
            jalali.year, jalali.month, jalali.day
        )),
        Granularity::Weekly => {
            // The week's own Jalali year, not the Gregorian year of the
            // timestamp: a Gregorian week can straddle Nowruz.
            let week = jalali.week_of_year()?;
            Ok(format!("هفته {week} سال {}", jalali.year))
        }
        Granularity::Monthly => Ok(format!(
            "ماه {} سال {}",
            jalali.month_name(),
            jalali.year
        )),
    }
}

/// Week number of a date in the storage (Gregorian) calendar.
///
/// Sunday-based: week 1 starts at the first Sunday of the year, days
/// before it are week 0. Matches the store's `$week` group operator.
pub fn storage_week(date: NaiveDate) -> u32 {
    let jan1_weekday = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    let first_sunday = (7 - jan1_weekday) % 7;
    let ordinal = date.ordinal0();
    if ordinal < first_sunday {
        0
    } else {
        (ordinal - first_sunday) / 7 + 1
    }
}

/// Rebuild a representative storage-calendar date from aggregation group
/// parts: the day itself for daily groups, the first day of the week for
/// weekly groups, day 1 for monthly groups.
///
/// Group parts come from the document store and may be arbitrary; parts
/// that do not form a valid date are a [`ReportError::MalformedGroup`].
pub fn representative_date(granularity: Granularity, key: &GroupKey) -> Result<NaiveDate> {
    let malformed = || ReportError::MalformedGroup(format!("{key:?}"));
    match granularity {
        Granularity::Daily => {
            let month = key.month.ok_or_else(malformed)?;
            let day = key.day.ok_or_else(malformed)?;
            NaiveDate::from_ymd_opt(key.year, month, day).ok_or_else(malformed)
        }
        Granularity::Weekly => {
            let week = key.week.ok_or_else(malformed)?;
            let jan1 = NaiveDate::from_ymd_opt(key.year, 1, 1).ok_or_else(malformed)?;
            if week == 0 {
                return Ok(jan1);
            }
            let first_sunday = (7 - jan1.weekday().num_days_from_sunday()) % 7;
            jan1.checked_add_days(Days::new(u64::from(first_sunday + (week - 1) * 7)))
                .filter(|d| d.year() == key.year)
                .ok_or_else(malformed)
        }
        Granularity::Monthly => {
            let month = key.month.ok_or_else(malformed)?;
            NaiveDate::from_ymd_opt(key.year, month, 1).ok_or_else(malformed)
        }
    }
}
