//! Gregorian ↔ Jalali (Solar Hijri) conversion
//!
//! Arithmetic port of the jalaali calendar algorithm (Birashk break years).
//! Pure functions over Julian Day Numbers; all division truncates toward
//! zero to match the reference arithmetic.

use crate::types::{ReportError, Result};
use chrono::{Datelike, NaiveDate};

/// Jalali years at which the leap-year pattern shifts.
const BREAKS: [i64; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

/// Persian month names, indexed by month number 1..=12.
const MONTH_NAMES: [&str; 12] = [
    "فروردین",
    "اردیبهشت",
    "خرداد",
    "تیر",
    "مرداد",
    "شهریور",
    "مهر",
    "آبان",
    "آذر",
    "دی",
    "بهمن",
    "اسفند",
];

/// A date in the Jalali calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JalaliDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl JalaliDate {
    /// Convert a Gregorian date. Errors only outside the supported
    /// Jalali range (years -61..3178).
    pub fn from_gregorian(date: NaiveDate) -> Result<Self> {
        let jdn = gregorian_to_jdn(date.year() as i64, date.month() as i64, date.day() as i64);
        jdn_to_jalali(jdn)
    }

    /// Persian name of this date's month.
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month as usize) - 1]
    }

    /// Day index within the Jalali year, 1-based.
    pub fn day_of_year(&self) -> u32 {
        if self.month <= 6 {
            (self.month - 1) * 31 + self.day
        } else {
            186 + (self.month - 7) * 30 + self.day
        }
    }

    /// Week of the Jalali year, 1-based. Weeks start on Saturday; week 1
    /// contains Farvardin 1.
    pub fn week_of_year(&self) -> Result<u32> {
        let first = jalali_to_jdn(self.year as i64, 1, 1)?;
        let offset = weekday_sat0(first);
        Ok((self.day_of_year() + offset - 1) / 7 + 1)
    }
}

/// Weekday of a Julian Day Number with Saturday = 0.
fn weekday_sat0(jdn: i64) -> u32 {
    // jdn % 7 == 0 falls on a Monday
    ((jdn % 7 + 2) % 7) as u32
}

/// Julian Day Number of a Gregorian date.
pub fn gregorian_to_jdn(gy: i64, gm: i64, gd: i64) -> i64 {
    let mut d = (gy + (gm - 8) / 6 + 100100) * 1461 / 4 + (153 * ((gm + 9) % 12) + 2) / 5 + gd
        - 34840408;
    d = d - (gy + 100100 + (gm - 8) / 6) / 100 * 3 / 4 + 752;
    d
}

/// Gregorian (year, month, day) of a Julian Day Number.
pub fn jdn_to_gregorian(jdn: i64) -> (i64, u32, u32) {
    let mut j = 4 * jdn + 139361631;
    j += (4 * jdn + 183187720) / 146097 * 3 / 4 * 4 - 3908;
    let i = j % 1461 / 4 * 5 + 308;
    let gd = i % 153 / 5 + 1;
    let gm = i / 153 % 12 + 1;
    let gy = j / 1461 - 100100 + (8 - gm) / 12;
    (gy, gm as u32, gd as u32)
}

/// Leap-cycle data for a Jalali year: (leap index, Gregorian year,
/// March day of Farvardin 1).
fn jal_cal(jy: i64) -> Result<(i64, i64, i64)> {
    if jy < BREAKS[0] || jy >= BREAKS[BREAKS.len() - 1] {
        return Err(ReportError::MalformedGroup(format!(
            "jalali year {jy} out of range"
        )));
    }

    let gy = jy + 621;
    let mut leap_j = -14i64;
    let mut jp = BREAKS[0];
    let mut jump = 0i64;

    for &jm in &BREAKS[1..] {
        jump = jm - jp;
        if jy < jm {
            break;
        }
        leap_j += jump / 33 * 8 + jump % 33 / 4;
        jp = jm;
    }

    let mut n = jy - jp;
    leap_j += n / 33 * 8 + (n % 33 + 3) / 4;
    if jump % 33 == 4 && jump - n == 4 {
        leap_j += 1;
    }

    let leap_g = gy / 4 - (gy / 100 + 1) * 3 / 4 - 150;
    let march = 20 + leap_j - leap_g;

    if jump - n < 6 {
        n = n - jump + (jump + 4) / 33 * 33;
    }
    let mut leap = ((n + 1) % 33 - 1) % 4;
    if leap == -1 {
        leap = 4;
    }

    Ok((leap, gy, march))
}

/// Julian Day Number of a Jalali date.
pub fn jalali_to_jdn(jy: i64, jm: i64, jd: i64) -> Result<i64> {
    let (_, gy, march) = jal_cal(jy)?;
    Ok(gregorian_to_jdn(gy, 3, march) + (jm - 1) * 31 - jm / 7 * (jm - 7) + jd - 1)
}

/// Jalali date of a Julian Day Number.
pub fn jdn_to_jalali(jdn: i64) -> Result<JalaliDate> {
    let (gy, _, _) = jdn_to_gregorian(jdn);
    let mut jy = gy - 621;
    let (leap, _, march) = jal_cal(jy)?;
    let jdn1f = gregorian_to_jdn(gy, 3, march);

    let mut k = jdn - jdn1f;
    if k >= 0 {
        if k <= 185 {
            return Ok(JalaliDate {
                year: jy as i32,
                month: (1 + k / 31) as u32,
                day: (k % 31 + 1) as u32,
            });
        }
        k -= 186;
    } else {
        jy -= 1;
        k += 179;
        if leap == 1 {
            k += 1;
        }
    }

    Ok(JalaliDate {
        year: jy as i32,
        month: (7 + k / 30) as u32,
        day: (k % 30 + 1) as u32,
    })
}
