// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Civil calendar ⇄ two-part Julian date.
//!
//! Both directions follow Meeus, *Astronomical Algorithms* (2nd ed.), ch. 7,
//! evaluated with integer floor divisions so that negative (astronomical)
//! years behave the same as positive ones.
//!
//! | Range | Calendar |
//! |-------|----------|
//! | before 1582-10-15 | proleptic Julian |
//! | from 1582-10-15 (JD 2 299 160.5) | Gregorian |
//!
//! Years use astronomical numbering: year `0` is 1 B.C., year `-1` is
//! 2 B.C. and so on. The day of the month is *not* range-checked: day `32`
//! of January rolls into February and day `0` of March is the last day of
//! February.

use crate::error::{Error, Result};
use crate::instant::JulianInstant;
use crate::scales::TimeScale;
use chrono::Weekday;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;
const MICROS_PER_DAY: i64 = 86_400_000_000;
const MICROS_PER_HOUR: i64 = 3_600_000_000;
const MICROS_PER_MINUTE: i64 = 60_000_000;

/// First Julian Day Number on which the Gregorian rules apply (1582-10-15).
const GREGORIAN_CUTOVER_JDN: i64 = 2_299_161;

// ═══════════════════════════════════════════════════════════════════════════
// CivilDate
// ═══════════════════════════════════════════════════════════════════════════

/// Historical era of a civil year.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Era {
    /// Anno Domini, astronomical year ≥ 1.
    AD,
    /// Before Christ, astronomical year ≤ 0.
    BC,
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Era::AD => f.write_str("A.D."),
            Era::BC => f.write_str("B.C."),
        }
    }
}

/// Broken-down calendar view of an instant.
///
/// A `CivilDate` carries no time scale of its own: it is whatever scale the
/// instant it came from (or is turned into) is tagged with.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CivilDate {
    /// Astronomical year (`0` = 1 B.C.).
    pub year: i32,
    /// Month, `1..=12`.
    pub month: u32,
    /// Day of the month, `1..=31`.
    pub day: u32,
    /// Hour, `0..=23`.
    pub hour: u32,
    /// Minute, `0..=59`.
    pub minute: u32,
    /// Seconds with fraction, `0 ≤ second < 60`.
    pub second: f64,
}

impl CivilDate {
    /// Midnight at the start of the given date.
    pub const fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0.0,
        }
    }

    /// Same date with a time of day.
    pub const fn with_time(self, hour: u32, minute: u32, second: f64) -> Self {
        Self {
            hour,
            minute,
            second,
            ..self
        }
    }

    /// Convert to a Julian instant tagged with `scale`.
    pub fn to_instant(&self, scale: TimeScale) -> Result<JulianInstant> {
        let day = i32::try_from(self.day).map_err(|_| Error::invalid_date("day", self.day))?;
        civil_to_jd(
            self.year,
            self.month,
            day,
            self.hour,
            self.minute,
            self.second,
            scale,
        )
    }

    /// `B.C.` for astronomical years below 1.
    #[inline]
    pub const fn era(&self) -> Era {
        if self.year < 1 {
            Era::BC
        } else {
            Era::AD
        }
    }

    #[inline]
    pub fn is_leap_year(&self) -> bool {
        is_leap_year(self.year)
    }

    /// Ordinal day within the year, starting at 1.
    pub fn day_of_year(&self) -> u32 {
        ordinal(self.year, self.month, self.day as i64)
    }

    /// Day of the week.
    pub fn weekday(&self) -> Weekday {
        weekday_of(day_number(self.year, self.month, self.day as i64))
    }

    /// Seconds elapsed since midnight.
    #[inline]
    pub fn seconds_of_day(&self) -> f64 {
        f64::from(self.hour) * 3_600.0 + f64::from(self.minute) * 60.0 + self.second
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Conversions
// ═══════════════════════════════════════════════════════════════════════════

/// Convert a civil date and time to a two-part Julian date.
///
/// ```text
/// JD = ⌊365.25 (Y + 4716)⌋ + ⌊30.6001 (M + 1)⌋ + D + B − 1524.5
/// ```
///
/// with January and February counted as months 13 and 14 of the previous
/// year and `B = 2 − A + ⌊A/4⌋`, `A = ⌊Y/100⌋` (Gregorian) or `B = 0`
/// (Julian).
///
/// # Errors
///
/// [`Error::InvalidDate`] when `month ∉ [1,12]`, `hour ∉ [0,23]`,
/// `minute ∉ [0,59]` or `second ∉ [0,60)`.  `day` is accepted as is and
/// rolls over month boundaries.  A date past
/// [`JulianInstant::MAX_DAY`] or before [`JulianInstant::MIN_DAY`] fails
/// with `field = "day"`.
pub fn civil_to_jd(
    year: i32,
    month: u32,
    day: i32,
    hour: u32,
    minute: u32,
    second: f64,
    scale: TimeScale,
) -> Result<JulianInstant> {
    if !(1..=12).contains(&month) {
        return Err(Error::invalid_date("month", month));
    }
    if hour > 23 {
        return Err(Error::invalid_date("hour", hour));
    }
    if minute > 59 {
        return Err(Error::invalid_date("minute", minute));
    }
    if !second.is_finite() || !(0.0..60.0).contains(&second) {
        return Err(Error::invalid_date("second", second));
    }

    let jdn = day_number(year, month, i64::from(day));
    let seconds = f64::from(hour) * 3_600.0 + f64::from(minute) * 60.0 + second;

    // JDN counts from noon; civil midnight is half a day earlier.
    JulianInstant::try_new(jdn - 1, 0.5 + seconds / SECONDS_PER_DAY, scale)
}

/// Convert a two-part Julian date back to civil components.
///
/// The time of day is resolved to the nearest microsecond; a value that
/// rounds up to 24:00 rolls over into the next day.
pub fn jd_to_civil(instant: &JulianInstant) -> CivilDate {
    // Shift the noon-based fraction to a midnight-based one.
    let shifted = instant.frac() + 0.5;
    let whole = shifted.floor();
    let mut z = instant.day() + whole as i64;
    let mut micros = ((shifted - whole) * MICROS_PER_DAY as f64).round() as i64;
    if micros >= MICROS_PER_DAY {
        z += 1;
        micros -= MICROS_PER_DAY;
    }

    let (year, month, day) = day_number_to_ymd(z);

    let hour = micros / MICROS_PER_HOUR;
    micros -= hour * MICROS_PER_HOUR;
    let minute = micros / MICROS_PER_MINUTE;
    micros -= minute * MICROS_PER_MINUTE;

    CivilDate {
        year,
        month,
        day,
        hour: hour as u32,
        minute: minute as u32,
        second: micros as f64 / 1e6,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Leap-year test matching the calendar in force for that year: Julian rule
/// (every fourth year) up to 1582, Gregorian rule afterwards.
///
/// ```
/// use astrodate::is_leap_year;
/// assert!(is_leap_year(2000));
/// assert!(!is_leap_year(1900));
/// assert!(is_leap_year(1500));
/// ```
pub fn is_leap_year(year: i32) -> bool {
    if year <= 1582 {
        year.rem_euclid(4) == 0
    } else {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }
}

/// Ordinal day of `year-month-day` within its year (1 = January 1st).
///
/// # Errors
///
/// [`Error::InvalidDate`] when `month ∉ [1,12]` or `day ∉ [1,31]`.
pub fn day_of_year(year: i32, month: u32, day: u32) -> Result<u32> {
    if !(1..=12).contains(&month) {
        return Err(Error::invalid_date("month", month));
    }
    if !(1..=31).contains(&day) {
        return Err(Error::invalid_date("day", day));
    }
    Ok(ordinal(year, month, i64::from(day)))
}

fn ordinal(year: i32, month: u32, day: i64) -> u32 {
    (day_number(year, month, day) - day_number(year, 1, 1) + 1) as u32
}

fn weekday_of(jdn: i64) -> Weekday {
    const FROM_SUNDAY: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];
    FROM_SUNDAY[(jdn + 1).rem_euclid(7) as usize]
}

/// Julian Day Number (the JD at noon) of a civil date.
pub(crate) fn day_number(year: i32, month: u32, day: i64) -> i64 {
    let gregorian = (year, month, day) >= (1582, 10, 15);

    let (y, m) = if month <= 2 {
        (i64::from(year) - 1, i64::from(month) + 12)
    } else {
        (i64::from(year), i64::from(month))
    };

    let b = if gregorian {
        let a = y.div_euclid(100);
        2 - a + a.div_euclid(4)
    } else {
        0
    };

    // ⌊365.25 k⌋ = ⌊1461 k / 4⌋, ⌊30.6001 k⌋ = ⌊306001 k / 10000⌋
    (1461 * (y + 4716)).div_euclid(4) + (306_001 * (m + 1)).div_euclid(10_000) + day + b - 1524
}

/// Inverse of [`day_number`].
fn day_number_to_ymd(z: i64) -> (i32, u32, u32) {
    let a = if z >= GREGORIAN_CUTOVER_JDN {
        // α = ⌊(z − 1867216.25) / 36524.25⌋
        let alpha = (100 * z - 186_721_625).div_euclid(3_652_425);
        z + 1 + alpha - alpha.div_euclid(4)
    } else {
        z
    };

    let b = a + 1524;
    let c = (100 * b - 12_210).div_euclid(36_525);
    let d = (1461 * c).div_euclid(4);
    let e = ((b - d) * 10_000).div_euclid(306_001);

    let day = b - d - (306_001 * e).div_euclid(10_000);
    let month = if e < 14 { e - 1 } else { e - 13 };
    let year = if month > 2 { c - 4716 } else { c - 4715 };
    // |z| ≤ MAX_DAY + 2 keeps the year within ±1.37e9.
    let year = i32::try_from(year).unwrap_or(if year < 0 { i32::MIN } else { i32::MAX });

    (year, month as u32, day as u32)
}
