// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Conversion of [`JulianInstant`]s between time scales.
//!
//! The scales form a chain and every conversion walks it one edge at a time:
//!
//! ```text
//!   UT1 ⇄ UTC ⇄ TAI ⇄ TT ⇄ TDB
//! ```
//!
//! | Edge | Forward | Inverse |
//! |------|---------|---------|
//! | UTC → TAI | `+ (TAI−UTC)` from the leap-second table | lookup with the TAI value, subtract, re-check once |
//! | TAI → TT  | `+ 32.184 s` | `− 32.184 s` |
//! | TT → TDB  | `+ 0.001658 sin g + 0.000014 sin 2g` | three-pass fixed point |
//! | UTC → UT1 | `+ ΔUT1` from [`EarthOrientation`] | three-pass fixed point |
//!
//! So `TT → UTC` is `TT → TAI → UTC` and `UT1 → TT` is
//! `UT1 → UTC → TAI → TT`.  Converting to the scale an instant is already
//! in returns it unchanged.
//!
//! The converter never mutates its input; it holds the leap-second table and
//! the ΔUT1 provider behind `Arc`s and is cheap to clone and share.

use crate::earth_orientation::{EarthOrientation, NoEarthOrientation};
use crate::error::{Error, Result};
use crate::instant::JulianInstant;
use crate::leap_seconds::LeapSecondTable;
use crate::scales::{tdb_minus_tt, TimeScale, TT_MINUS_TAI};
use crate::source::{self, LeapSecondStore};
use chrono::{DateTime, Utc};
use qtty::{Days, Seconds};
use std::fmt;
use std::sync::Arc;

/// Passes used to invert the TDB and UT1 corrections.
const FIXED_POINT_PASSES: usize = 3;

/// Moves instants along the `UT1 – UTC – TAI – TT – TDB` chain.
#[derive(Clone)]
pub struct TimeScaleConverter {
    leap_seconds: Arc<LeapSecondTable>,
    earth_orientation: Arc<dyn EarthOrientation>,
}

impl fmt::Debug for TimeScaleConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeScaleConverter")
            .field("leap_seconds", &self.leap_seconds.len())
            .finish_non_exhaustive()
    }
}

impl TimeScaleConverter {
    // ── construction ──────────────────────────────────────────────────

    /// Converter over the given leap-second table, without ΔUT1 data.
    pub fn new(leap_seconds: impl Into<Arc<LeapSecondTable>>) -> Self {
        Self {
            leap_seconds: leap_seconds.into(),
            earth_orientation: Arc::new(NoEarthOrientation),
        }
    }

    /// Converter over the schedule embedded in the crate.
    pub fn builtin() -> Self {
        Self::new(LeapSecondTable::builtin())
    }

    /// Converter over the table currently held by `store`, loading it if
    /// needed.
    pub fn from_store(store: &LeapSecondStore) -> Result<Self> {
        Ok(Self::new(store.ensure_loaded()?))
    }

    /// Converter over the process-wide store ([`source::global`]).
    pub fn from_global() -> Result<Self> {
        Self::from_store(source::global())
    }

    /// Attach a ΔUT1 provider, enabling conversions to and from UT1.
    pub fn with_earth_orientation(mut self, provider: impl EarthOrientation + 'static) -> Self {
        self.earth_orientation = Arc::new(provider);
        self
    }

    pub fn leap_seconds(&self) -> &LeapSecondTable {
        &self.leap_seconds
    }

    // ── conversions ───────────────────────────────────────────────────

    /// Express `instant` on `target`.
    ///
    /// # Errors
    ///
    /// [`Error::SourceUnavailable`] when the route crosses the UT1 edge and
    /// the ΔUT1 provider has no value.
    pub fn convert(&self, instant: &JulianInstant, target: TimeScale) -> Result<JulianInstant> {
        let mut current = *instant;
        while current.scale() != target {
            current = if target.chain_position() > current.scale().chain_position() {
                self.step_up(&current)?
            } else {
                self.step_down(&current)?
            };
        }
        Ok(current)
    }

    #[inline]
    pub fn to_utc(&self, instant: &JulianInstant) -> Result<JulianInstant> {
        self.convert(instant, TimeScale::UTC)
    }

    #[inline]
    pub fn to_tai(&self, instant: &JulianInstant) -> Result<JulianInstant> {
        self.convert(instant, TimeScale::TAI)
    }

    #[inline]
    pub fn to_tt(&self, instant: &JulianInstant) -> Result<JulianInstant> {
        self.convert(instant, TimeScale::TT)
    }

    #[inline]
    pub fn to_tdb(&self, instant: &JulianInstant) -> Result<JulianInstant> {
        self.convert(instant, TimeScale::TDB)
    }

    #[inline]
    pub fn to_ut1(&self, instant: &JulianInstant) -> Result<JulianInstant> {
        self.convert(instant, TimeScale::UT1)
    }

    // ── helpers ───────────────────────────────────────────────────────

    /// `TAI − UTC` in effect at `instant` (any scale).
    pub fn tai_minus_utc(&self, instant: &JulianInstant) -> Result<Seconds> {
        let utc = self.to_utc(instant)?;
        Ok(leap_offset(&self.leap_seconds, &utc))
    }

    /// Signed interval `a − b`, after bringing `b` onto `a`'s scale.
    pub fn diff(&self, a: &JulianInstant, b: &JulianInstant) -> Result<Days> {
        let b = self.convert(b, a.scale())?;
        Ok(a.diff(&b))
    }

    /// The instant as a `chrono` UTC timestamp.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDate`] when the year falls outside chrono's range.
    pub fn to_datetime(&self, instant: &JulianInstant) -> Result<DateTime<Utc>> {
        let utc = self.to_utc(instant)?;
        utc.to_unix_datetime()
            .ok_or_else(|| Error::invalid_date("year", utc.to_civil().year))
    }

    // ── chain edges ───────────────────────────────────────────────────

    fn step_up(&self, t: &JulianInstant) -> Result<JulianInstant> {
        match t.scale() {
            TimeScale::UT1 => self.ut1_to_utc(t),
            TimeScale::UTC => Ok(self.utc_to_tai(t)),
            TimeScale::TAI => Ok((*t + TT_MINUS_TAI).with_scale(TimeScale::TT)),
            TimeScale::TT => Ok((*t + tdb_minus_tt(t)).with_scale(TimeScale::TDB)),
            TimeScale::TDB => Err(Error::UnsupportedScale(
                "no scale above TDB on the conversion chain".to_string(),
            )),
        }
    }

    fn step_down(&self, t: &JulianInstant) -> Result<JulianInstant> {
        match t.scale() {
            TimeScale::TDB => Ok(tdb_to_tt(t)),
            TimeScale::TT => Ok((*t - TT_MINUS_TAI).with_scale(TimeScale::TAI)),
            TimeScale::TAI => Ok(self.tai_to_utc(t)),
            TimeScale::UTC => self.utc_to_ut1(t),
            TimeScale::UT1 => Err(Error::UnsupportedScale(
                "no scale below UT1 on the conversion chain".to_string(),
            )),
        }
    }

    fn utc_to_tai(&self, utc: &JulianInstant) -> JulianInstant {
        (*utc + leap_offset(&self.leap_seconds, utc)).with_scale(TimeScale::TAI)
    }

    /// The table is keyed by UTC, so the TAI value stands in for UTC on the
    /// first lookup. The candidate is re-checked once, which settles every
    /// instant except those inside an inserted leap second.
    fn tai_to_utc(&self, tai: &JulianInstant) -> JulianInstant {
        let first = leap_offset(&self.leap_seconds, tai);
        let mut utc = *tai - first;
        let second = leap_offset(&self.leap_seconds, &utc);
        if second != first {
            utc = *tai - second;
        }
        utc.with_scale(TimeScale::UTC)
    }

    fn utc_to_ut1(&self, utc: &JulianInstant) -> Result<JulianInstant> {
        let dut1 = self.earth_orientation.dut1(utc)?;
        Ok((*utc + dut1).with_scale(TimeScale::UT1))
    }

    fn ut1_to_utc(&self, ut1: &JulianInstant) -> Result<JulianInstant> {
        let mut utc = ut1.with_scale(TimeScale::UTC);
        for _ in 0..FIXED_POINT_PASSES {
            let dut1 = self.earth_orientation.dut1(&utc)?;
            utc = (*ut1 - dut1).with_scale(TimeScale::UTC);
        }
        Ok(utc)
    }
}

impl Default for TimeScaleConverter {
    fn default() -> Self {
        Self::builtin()
    }
}

fn leap_offset(table: &LeapSecondTable, instant: &JulianInstant) -> Seconds {
    Seconds::new(f64::from(table.lookup(instant)))
}

/// The periodic term is evaluated at TT, so iterate `tt = tdb − Δ(tt)`.
fn tdb_to_tt(tdb: &JulianInstant) -> JulianInstant {
    let mut tt = tdb.with_scale(TimeScale::TT);
    for _ in 0..FIXED_POINT_PASSES {
        tt = (*tdb - tdb_minus_tt(&tt)).with_scale(TimeScale::TT);
    }
    tt
}
