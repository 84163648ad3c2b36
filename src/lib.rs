// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Astronomical dates
//!
//! Precise instants on the astronomical time scales, their calendar form, and
//! the conversions between them.
//!
//! # Core types
//!
//! - [`JulianInstant`] — two-part Julian date (whole day + fraction) tagged
//!   with a [`TimeScale`].
//! - [`TimeScale`] — closed set of scales: UTC, TAI, TT, TDB, UT1.
//! - [`CivilDate`] — year/month/day/hour/minute/second view of an instant.
//! - [`TimeScaleConverter`] — moves instants between scales.
//! - [`LeapSecondTable`] — the `TAI − UTC` schedule.
//! - [`LeapSecondStore`] — lazily loaded, cached, refreshable schedule.
//! - [`EarthOrientation`] — ΔUT1 provider needed for UT1.
//!
//! # Conversion chain
//!
//! | From → To | Offset |
//! |-----------|--------|
//! | UTC → TAI | leap seconds (`TAI − UTC`) |
//! | TAI → TT  | 32.184 s |
//! | TT → TDB  | `0.001658 sin g + 0.000014 sin 2g` s |
//! | UTC → UT1 | ΔUT1 |
//!
//! Longer routes are composed from these edges.
//!
//! # Example
//!
//! ```
//! use astrodate::{civil_to_jd, TimeScale, TimeScaleConverter};
//!
//! let utc = civil_to_jd(2014, 1, 1, 0, 0, 0.0, TimeScale::UTC)?;
//! let conv = TimeScaleConverter::builtin();
//! let tt = conv.to_tt(&utc)?;
//! assert!((tt.jd() - 2_456_658.500_777_592_6).abs() < 1e-9);
//! # Ok::<(), astrodate::Error>(())
//! ```

pub(crate) mod calendar;
pub(crate) mod converter;
pub(crate) mod earth_orientation;
pub(crate) mod error;
pub(crate) mod instant;
pub(crate) mod leap_seconds;
pub mod source;
pub(crate) mod scales;

// ── Re-exports ────────────────────────────────────────────────────────────

pub use calendar::{civil_to_jd, day_of_year, is_leap_year, jd_to_civil, CivilDate, Era};
pub use converter::TimeScaleConverter;
pub use earth_orientation::{ConstantDut1, Dut1Table, EarthOrientation, NoEarthOrientation};
pub use error::{Error, Result};
pub use instant::JulianInstant;
pub use leap_seconds::{LeapSecondEntry, LeapSecondTable};
pub use scales::{tdb_minus_tt, TimeScale, TT_MINUS_TAI};
pub use source::{Fetch, HttpFetcher, LeapSecondStore, RefreshPolicy, RetryPolicy, SourceConfig};
