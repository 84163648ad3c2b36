// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Time-scale tags and the fixed/periodic offsets between them.
//!
//! A [`TimeScale`] is a closed tag attached to every
//! [`JulianInstant`](crate::JulianInstant).  It never carries data of its own;
//! the offsets that move an instant between scales live here as constants and
//! pure functions, while the routing between them lives in
//! [`TimeScaleConverter`](crate::TimeScaleConverter).
//!
//! # Conversion chain
//!
//! ```text
//! UT1 ──ΔUT1── UTC ──leap seconds── TAI ──32.184 s── TT ──periodic── TDB
//! ```
//!
//! | Scale | Description | Offset to its neighbour |
//! |-------|-------------|-------------------------|
//! | [`UT1`](TimeScale::UT1) | Universal Time (Earth rotation) | `UT1 = UTC + ΔUT1` (IERS, injected) |
//! | [`UTC`](TimeScale::UTC) | Coordinated Universal Time | `TAI = UTC + leap seconds` |
//! | [`TAI`](TimeScale::TAI) | International Atomic Time | `TT = TAI + 32.184 s` |
//! | [`TT`](TimeScale::TT)   | Terrestrial Time | `TDB = TT + 0.001658 sin g + 0.000014 sin 2g` |
//! | [`TDB`](TimeScale::TDB) | Barycentric Dynamical Time | — |

use crate::error::Error;
use crate::instant::JulianInstant;
use qtty::Seconds;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Astronomical time scale an instant is expressed in.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimeScale {
    /// Coordinated Universal Time.
    UTC,
    /// International Atomic Time.
    TAI,
    /// Terrestrial Time.
    TT,
    /// Barycentric Dynamical Time.
    TDB,
    /// Universal Time tied to Earth's rotation.
    UT1,
}

impl TimeScale {
    /// Every supported scale, in conversion-chain order.
    pub const ALL: [TimeScale; 5] = [
        TimeScale::UT1,
        TimeScale::UTC,
        TimeScale::TAI,
        TimeScale::TT,
        TimeScale::TDB,
    ];

    /// Short label, e.g. `"TDB"`.
    pub const fn abbreviation(self) -> &'static str {
        match self {
            TimeScale::UTC => "UTC",
            TimeScale::TAI => "TAI",
            TimeScale::TT => "TT",
            TimeScale::TDB => "TDB",
            TimeScale::UT1 => "UT1",
        }
    }

    /// Full English name of the scale.
    pub const fn name(self) -> &'static str {
        match self {
            TimeScale::UTC => "Coordinated Universal Time",
            TimeScale::TAI => "International Atomic Time",
            TimeScale::TT => "Terrestrial Time",
            TimeScale::TDB => "Barycentric Dynamical Time",
            TimeScale::UT1 => "Universal Time",
        }
    }

    /// Position on the `UT1 – UTC – TAI – TT – TDB` chain.
    #[inline]
    pub(crate) const fn chain_position(self) -> u8 {
        match self {
            TimeScale::UT1 => 0,
            TimeScale::UTC => 1,
            TimeScale::TAI => 2,
            TimeScale::TT => 3,
            TimeScale::TDB => 4,
        }
    }
}

// ── Display / FromStr ─────────────────────────────────────────────────────

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for TimeScale {
    type Err = Error;

    /// Parses a scale label, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UTC" => Ok(TimeScale::UTC),
            "TAI" => Ok(TimeScale::TAI),
            "TT" => Ok(TimeScale::TT),
            "TDB" => Ok(TimeScale::TDB),
            "UT1" => Ok(TimeScale::UT1),
            _ => Err(Error::UnsupportedScale(s.trim().to_string())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Offsets between neighbouring scales
// ═══════════════════════════════════════════════════════════════════════════

/// `TT = TAI + 32.184 s`.
pub const TT_MINUS_TAI: Seconds = Seconds::new(32.184);

/// J2000.0 as a whole Julian day number (JD 2 451 545.0 = day 2 451 545, fraction 0).
pub(crate) const J2000_DAY: i64 = 2_451_545;

/// `TDB − TT` in seconds for an instant on the TT axis.
///
/// Uses the two-term IAU 1991 approximation:
///
/// ```text
/// g       = 357.53 + 0.9856003 (JD_TT − 2451545.0)      degrees
/// TDB−TT  = 0.001658 sin(g) + 0.000014 sin(2g)           seconds
/// ```
///
/// Amplitude is ≈1.66 ms with a one-year period.
///
/// ## References
/// * USNO Circular 179, eq. 2.6 (low-accuracy form)
/// * Explanatory Supplement to the Astronomical Almanac (1992), §2.222
#[inline]
pub fn tdb_minus_tt(jd_tt: &JulianInstant) -> Seconds {
    let g = (357.53 + 0.985_600_3 * jd_tt.days_since(J2000_DAY)).to_radians();
    Seconds::new(0.001_658 * g.sin() + 0.000_014 * (2.0 * g).sin())
}
