// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Two-part Julian instant.
//!
//! [`JulianInstant`] is the core value type of the crate.  It stores a Julian
//! date as a whole-day integer plus a day fraction in `[0, 1)` and tags the
//! pair with the [`TimeScale`] it is expressed in.  Keeping the two parts
//! apart holds sub-microsecond resolution for any date in recorded history;
//! a single `f64` Julian date near JD 2.4 M only resolves ≈40 µs.
//!
//! Values are immutable: every arithmetic operation and every scale
//! conversion returns a new instant.
//!
//! ```text
//!          day            frac
//!   ┌──────────────┐ ┌────────────┐
//!   │   2456658    │ │ 0.50040509 │  TAI
//!   └──────────────┘ └────────────┘
//!   noon-based Julian Day Number + fraction elapsed since that noon
//! ```

use crate::calendar::{self, CivilDate};
use crate::error::{Error, Result};
use crate::scales::TimeScale;
use chrono::{DateTime, Utc};
use qtty::{Day, Days, Second, Seconds};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Julian Day Number of the noon preceding the Unix epoch (1970-01-01 00:00 = JD 2 440 587.5).
const UNIX_EPOCH_DAY: i64 = 2_440_587;
/// Whole-day part of `JD − MJD` (2 400 000.5).
const MJD_EPOCH_DAY: i64 = 2_400_000;
const SECONDS_PER_DAY: f64 = 86_400.0;
/// Width of the representable day range, as an `f64` bound on deltas.
const DAY_SPAN: f64 = (JulianInstant::MAX_DAY - JulianInstant::MIN_DAY) as f64;

// ═══════════════════════════════════════════════════════════════════════════
// JulianInstant
// ═══════════════════════════════════════════════════════════════════════════

/// A point in time on one of the supported [`TimeScale`]s.
///
/// Invariant: `0 ≤ frac < 1` and `MIN_DAY ≤ day ≤ MAX_DAY`.  Every
/// constructor and operation renormalizes, carrying whole days from the
/// fraction into `day`.
///
/// The infallible constructors and operators saturate: a result past either
/// end of the range is pinned to that end, and a NaN fraction or delta is
/// dropped.  The `try_*` and `checked_*` variants report those cases as
/// [`Error::InvalidDate`] instead.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JulianInstant {
    day: i64,
    frac: f64,
    scale: TimeScale,
}

impl JulianInstant {
    /// Last representable whole day (civil year ≈ 1.37 × 10⁹).
    pub const MAX_DAY: i64 = 500_000_000_000;
    /// First representable whole day.
    pub const MIN_DAY: i64 = -Self::MAX_DAY;

    // ── constructors ──────────────────────────────────────────────────

    /// Build an instant from a whole day and a fraction of any magnitude.
    ///
    /// The fraction is folded into `[0, 1)`; the integer part of the
    /// overflow (or underflow) moves into `day`.
    ///
    /// ```
    /// use astrodate::{JulianInstant, TimeScale};
    /// let t = JulianInstant::new(2_451_545, -0.25, TimeScale::TT);
    /// assert_eq!(t.day(), 2_451_544);
    /// assert_eq!(t.frac(), 0.75);
    /// ```
    pub fn new(day: i64, frac: f64, scale: TimeScale) -> Self {
        let (day, frac) = normalize(day, frac);
        Self { day, frac, scale }
    }

    /// Like [`new`](Self::new), but rejects a non-finite fraction and a
    /// result outside `MIN_DAY..=MAX_DAY`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDate`] naming `frac` or `day`.
    pub fn try_new(day: i64, frac: f64, scale: TimeScale) -> Result<Self> {
        if !frac.is_finite() {
            return Err(Error::invalid_date("frac", frac));
        }
        let carried = carried_day(day, frac);
        let range = i128::from(Self::MIN_DAY)..=i128::from(Self::MAX_DAY);
        if !range.contains(&carried) {
            return Err(Error::invalid_date("day", carried as f64));
        }
        Ok(Self::new(day, frac, scale))
    }

    /// Build an instant from a single Julian date value.
    ///
    /// Convenient for literals; precision is limited to that of the `f64`
    /// argument.
    pub fn from_jd(jd: f64, scale: TimeScale) -> Self {
        let day = jd.floor();
        Self::new(day as i64, jd - day, scale)
    }

    /// Fallible form of [`from_jd`](Self::from_jd).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDate`] when `jd` is not finite or out of range.
    pub fn try_from_jd(jd: f64, scale: TimeScale) -> Result<Self> {
        if !jd.is_finite() {
            return Err(Error::invalid_date("jd", jd));
        }
        let day = jd.floor();
        Self::try_new(day as i64, jd - day, scale)
    }

    /// Build an instant from a Modified Julian Date (`MJD = JD − 2400000.5`).
    pub fn from_mjd(mjd: f64, scale: TimeScale) -> Self {
        let day = mjd.floor();
        Self::new(
            MJD_EPOCH_DAY.saturating_add(day as i64),
            mjd - day + 0.5,
            scale,
        )
    }

    /// Fallible form of [`from_mjd`](Self::from_mjd).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDate`] when `mjd` is not finite or out of range.
    pub fn try_from_mjd(mjd: f64, scale: TimeScale) -> Result<Self> {
        if !mjd.is_finite() {
            return Err(Error::invalid_date("mjd", mjd));
        }
        let day = mjd.floor();
        Self::try_new(
            MJD_EPOCH_DAY.saturating_add(day as i64),
            mjd - day + 0.5,
            scale,
        )
    }

    /// Build an instant from civil calendar components.
    pub fn from_civil(date: &CivilDate, scale: TimeScale) -> Result<Self> {
        date.to_instant(scale)
    }

    /// Instant corresponding to a `chrono` UTC timestamp, tagged
    /// [`TimeScale::UTC`].
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        let secs = datetime.timestamp();
        let nanos = f64::from(datetime.timestamp_subsec_nanos()) / 1e9;
        let day = UNIX_EPOCH_DAY + secs.div_euclid(86_400);
        let seconds_of_day = secs.rem_euclid(86_400) as f64 + nanos;
        Self::new(day, 0.5 + seconds_of_day / SECONDS_PER_DAY, TimeScale::UTC)
    }

    /// The current instant from the system clock, tagged
    /// [`TimeScale::UTC`].
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    // ── accessors ─────────────────────────────────────────────────────

    /// Whole Julian days.
    #[inline]
    pub const fn day(&self) -> i64 {
        self.day
    }

    /// Fraction of the day elapsed since noon, in `[0, 1)`.
    #[inline]
    pub const fn frac(&self) -> f64 {
        self.frac
    }

    #[inline]
    pub const fn scale(&self) -> TimeScale {
        self.scale
    }

    /// Julian date collapsed into a single `f64` (lossy far from J2000).
    #[inline]
    pub fn jd(&self) -> f64 {
        self.day as f64 + self.frac
    }

    /// Julian date as a [`Days`] quantity.
    #[inline]
    pub fn quantity(&self) -> Days {
        Days::new(self.jd())
    }

    /// Modified Julian Date.
    #[inline]
    pub fn mjd(&self) -> f64 {
        (self.day - MJD_EPOCH_DAY) as f64 + self.frac - 0.5
    }

    /// Days elapsed since noon of `epoch_day`, keeping the integer and
    /// fractional parts apart until the final sum.
    #[inline]
    pub(crate) fn days_since(&self, epoch_day: i64) -> f64 {
        (self.day - epoch_day) as f64 + self.frac
    }

    /// Same numeric value re-labelled as `scale`.  Only the converter may do
    /// this, after applying the offset between the two scales.
    #[inline]
    pub(crate) fn with_scale(self, scale: TimeScale) -> Self {
        Self { scale, ..self }
    }

    // ── arithmetic ────────────────────────────────────────────────────

    /// Shift by a duration in days, carrying and borrowing across the
    /// day boundary.
    ///
    /// Saturates at the ends of the day range; a NaN delta leaves the
    /// instant unchanged.
    pub fn add_days(&self, delta: Days) -> Self {
        let delta = delta.value();
        if delta.is_nan() {
            return *self;
        }
        let mut whole = delta.trunc();
        let mut frac = self.frac + (delta - whole);

        if frac < 0.0 {
            frac += 1.0;
            whole -= 1.0;
        }
        if frac >= 1.0 {
            whole += frac.trunc();
            frac -= frac.trunc();
        }

        Self::new(self.day.saturating_add(whole as i64), frac, self.scale)
    }

    /// Shift by a duration in seconds.
    ///
    /// Whole days are split off the duration before it is converted, so that
    /// long intervals do not lose the sub-second part.
    pub fn add_seconds(&self, delta: Seconds) -> Self {
        let seconds = delta.value();
        let whole_days = (seconds / SECONDS_PER_DAY).trunc();
        if whole_days.is_nan() || whole_days.abs() > DAY_SPAN {
            return self.add_days(Days::new(whole_days));
        }
        let rest = seconds - whole_days * SECONDS_PER_DAY;
        self.add_days(Days::new(whole_days))
            .add_days(Seconds::new(rest).to::<Day>())
    }

    /// Like [`add_days`](Self::add_days), but fails instead of saturating.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDate`] when `delta` is not finite or the result falls
    /// outside `MIN_DAY..=MAX_DAY`.
    pub fn checked_add_days(&self, delta: Days) -> Result<Self> {
        let value = delta.value();
        if !value.is_finite() {
            return Err(Error::invalid_date("delta", value));
        }
        let reach = self.days_since(0) + value;
        if !(Self::MIN_DAY as f64..(Self::MAX_DAY + 1) as f64).contains(&reach) {
            return Err(Error::invalid_date("day", reach.floor()));
        }
        Ok(self.add_days(delta))
    }

    /// Like [`add_seconds`](Self::add_seconds), but fails instead of
    /// saturating.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDate`] when `delta` is not finite or the result falls
    /// outside `MIN_DAY..=MAX_DAY`.
    pub fn checked_add_seconds(&self, delta: Seconds) -> Result<Self> {
        if !delta.value().is_finite() {
            return Err(Error::invalid_date("delta", delta.value()));
        }
        self.checked_add_days(delta.to::<Day>())?;
        Ok(self.add_seconds(delta))
    }

    #[inline]
    pub fn sub_days(&self, delta: Days) -> Self {
        self.add_days(Days::new(-delta.value()))
    }

    #[inline]
    pub fn sub_seconds(&self, delta: Seconds) -> Self {
        self.add_seconds(Seconds::new(-delta.value()))
    }

    /// Signed interval `self − other` in days.
    ///
    /// Both instants are assumed to be on the same scale; use
    /// [`TimeScaleConverter::diff`](crate::TimeScaleConverter::diff) to
    /// compare instants on different scales.
    #[inline]
    pub fn diff(&self, other: &Self) -> Days {
        Days::new((self.day - other.day) as f64 + (self.frac - other.frac))
    }

    /// Chronological order of the raw values, ignoring the scale tag.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.day
            .cmp(&other.day)
            .then_with(|| self.frac.total_cmp(&other.frac))
    }

    // ── calendar helpers ──────────────────────────────────────────────

    /// Civil calendar components on this instant's own scale.
    #[inline]
    pub fn to_civil(&self) -> CivilDate {
        calendar::jd_to_civil(self)
    }

    /// Time elapsed since the preceding civil midnight.
    pub fn since_midnight(&self) -> Seconds {
        let shifted = self.frac + 0.5;
        Days::new(shifted - shifted.floor()).to::<Second>()
    }

    /// Time remaining until the next civil midnight.
    pub fn until_midnight(&self) -> Seconds {
        Seconds::new(SECONDS_PER_DAY) - self.since_midnight()
    }

    /// Numeric value read as UTC and mapped onto the Unix time line, with
    /// nanosecond rounding. `None` outside chrono's range.
    pub(crate) fn to_unix_datetime(&self) -> Option<DateTime<Utc>> {
        let seconds_of_day = (self.frac - 0.5) * SECONDS_PER_DAY;
        let whole = seconds_of_day.floor();
        let mut nanos = ((seconds_of_day - whole) * 1e9).round() as i64;
        let mut secs = (self.day - UNIX_EPOCH_DAY).checked_mul(86_400)? + whole as i64;
        if nanos >= 1_000_000_000 {
            nanos -= 1_000_000_000;
            secs += 1;
        }
        DateTime::<Utc>::from_timestamp(secs, nanos as u32)
    }
}

/// Fold `frac` into `[0, 1)`, carrying the whole-day overflow into `day`
/// and pinning the result to the representable day range.
#[inline]
fn normalize(day: i64, frac: f64) -> (i64, f64) {
    if frac.is_nan() {
        return pin(i128::from(day), 0.0);
    }
    let mut total = carried_day(day, frac);
    let mut frac = frac - frac.floor();
    // A tiny negative fraction can round up to exactly 1.0 above.
    if frac >= 1.0 {
        frac -= 1.0;
        total += 1;
    }
    pin(total, frac)
}

/// `day + ⌊frac⌋` without overflow; infinities land far outside the range.
#[inline]
fn carried_day(day: i64, frac: f64) -> i128 {
    i128::from(day) + frac.floor().clamp(-1e30, 1e30) as i128
}

#[inline]
fn pin(day: i128, frac: f64) -> (i64, f64) {
    if day > i128::from(JulianInstant::MAX_DAY) {
        (JulianInstant::MAX_DAY, 0.0)
    } else if day < i128::from(JulianInstant::MIN_DAY) {
        (JulianInstant::MIN_DAY, 0.0)
    } else {
        (day as i64, frac)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Trait implementations
// ═══════════════════════════════════════════════════════════════════════════

// ── Display ───────────────────────────────────────────────────────────────

impl fmt::Display for JulianInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JD {:.9} {}", self.jd(), self.scale)
    }
}

// ── Ordering ──────────────────────────────────────────────────────────────

impl PartialOrd for JulianInstant {
    /// Instants on different scales are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.scale != other.scale {
            return None;
        }
        match self.day.cmp(&other.day) {
            Ordering::Equal => self.frac.partial_cmp(&other.frac),
            ord => Some(ord),
        }
    }
}

// ── Serde ─────────────────────────────────────────────────────────────────

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct RawInstant {
    day: i64,
    frac: f64,
    scale: TimeScale,
}

#[cfg(feature = "serde")]
impl Serialize for JulianInstant {
    fn serialize<Ser>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        RawInstant {
            day: self.day,
            frac: self.frac,
            scale: self.scale,
        }
        .serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for JulianInstant {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawInstant::deserialize(deserializer)?;
        Self::try_new(raw.day, raw.frac, raw.scale).map_err(serde::de::Error::custom)
    }
}

// ── Arithmetic ────────────────────────────────────────────────────────────

impl Add<Days> for JulianInstant {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Days) -> Self::Output {
        self.add_days(rhs)
    }
}

impl AddAssign<Days> for JulianInstant {
    #[inline]
    fn add_assign(&mut self, rhs: Days) {
        *self = self.add_days(rhs);
    }
}

impl Sub<Days> for JulianInstant {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Days) -> Self::Output {
        self.sub_days(rhs)
    }
}

impl SubAssign<Days> for JulianInstant {
    #[inline]
    fn sub_assign(&mut self, rhs: Days) {
        *self = self.sub_days(rhs);
    }
}

impl Add<Seconds> for JulianInstant {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Seconds) -> Self::Output {
        self.add_seconds(rhs)
    }
}

impl AddAssign<Seconds> for JulianInstant {
    #[inline]
    fn add_assign(&mut self, rhs: Seconds) {
        *self = self.add_seconds(rhs);
    }
}

impl Sub<Seconds> for JulianInstant {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Seconds) -> Self::Output {
        self.sub_seconds(rhs)
    }
}

impl SubAssign<Seconds> for JulianInstant {
    #[inline]
    fn sub_assign(&mut self, rhs: Seconds) {
        *self = self.sub_seconds(rhs);
    }
}

impl Sub for JulianInstant {
    type Output = Days;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.diff(&rhs)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
