// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! ΔUT1 = UT1 − UTC providers.
//!
//! The correction comes from IERS Earth-orientation bulletins and is kept
//! outside the converter, which only sees the [`EarthOrientation`] trait.
//!
//! | Provider | Use |
//! |----------|-----|
//! | [`NoEarthOrientation`] | default; every query fails with `SourceUnavailable` |
//! | [`ConstantDut1`] | a single value, e.g. from the current Bulletin A |
//! | [`Dut1Table`] | daily samples keyed by MJD, linearly interpolated |
//! | any `Fn(&JulianInstant) -> Seconds` | caller-supplied model |

use crate::error::{Error, Result};
use crate::instant::JulianInstant;
use qtty::Seconds;
use tracing::debug;

/// Source of the `UT1 − UTC` correction.
pub trait EarthOrientation: Send + Sync {
    /// `UT1 − UTC` at the given UTC instant.
    fn dut1(&self, utc: &JulianInstant) -> Result<Seconds>;
}

impl<F> EarthOrientation for F
where
    F: Fn(&JulianInstant) -> Seconds + Send + Sync,
{
    fn dut1(&self, utc: &JulianInstant) -> Result<Seconds> {
        Ok(self(utc))
    }
}

/// Provider used when none was configured.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoEarthOrientation;

impl EarthOrientation for NoEarthOrientation {
    fn dut1(&self, _utc: &JulianInstant) -> Result<Seconds> {
        Err(Error::source_unavailable(
            "ΔUT1",
            "no Earth-orientation data configured",
        ))
    }
}

/// The same ΔUT1 for every instant.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConstantDut1(pub Seconds);

impl EarthOrientation for ConstantDut1 {
    fn dut1(&self, _utc: &JulianInstant) -> Result<Seconds> {
        Ok(self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Dut1Table
// ═══════════════════════════════════════════════════════════════════════════

/// Tabulated ΔUT1 samples with linear interpolation between them.
///
/// Queries outside the sampled span fail rather than extrapolate.
#[derive(Debug, Clone, PartialEq)]
pub struct Dut1Table {
    /// `(MJD, ΔUT1 seconds)`, sorted by MJD.
    samples: Vec<(f64, f64)>,
}

impl Dut1Table {
    /// Build from `(MJD, ΔUT1)` pairs in any order.  Non-finite samples are
    /// dropped; for a repeated MJD the first sample wins.
    ///
    /// # Errors
    ///
    /// [`Error::SourceUnavailable`] when no usable sample remains.
    pub fn new(samples: impl IntoIterator<Item = (f64, Seconds)>) -> Result<Self> {
        let mut samples: Vec<(f64, f64)> = samples
            .into_iter()
            .map(|(mjd, dut1)| (mjd, dut1.value()))
            .filter(|(mjd, dut1)| mjd.is_finite() && dut1.is_finite())
            .collect();

        if samples.is_empty() {
            return Err(Error::source_unavailable("ΔUT1 table", "no samples"));
        }

        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        samples.dedup_by(|later, earlier| later.0 == earlier.0);
        Ok(Self { samples })
    }

    /// Parse whitespace-separated `MJD ΔUT1` lines; `#` starts a comment.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedSchedule`] when no line parses.
    pub fn parse(text: &str) -> Result<Self> {
        let mut samples = Vec::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let parsed = match (tokens.next(), tokens.next()) {
                (Some(mjd), Some(dut1)) => mjd.parse::<f64>().ok().zip(dut1.parse::<f64>().ok()),
                _ => None,
            };
            match parsed {
                Some((mjd, dut1)) => samples.push((mjd, Seconds::new(dut1))),
                None => debug!("skipping ΔUT1 line {}: {:?}", number + 1, raw),
            }
        }

        if samples.is_empty() {
            return Err(Error::MalformedSchedule(
                "no ΔUT1 samples found".to_string(),
            ));
        }
        Self::new(samples)
    }

    /// First and last sampled MJD.
    pub fn span(&self) -> (f64, f64) {
        let first = self.samples[0].0;
        let last = self.samples[self.samples.len() - 1].0;
        (first, last)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn interpolate(&self, mjd: f64) -> Option<f64> {
        let (first, last) = self.span();
        if !(first..=last).contains(&mjd) {
            return None;
        }

        let idx = self.samples.partition_point(|(m, _)| *m <= mjd);
        if idx == self.samples.len() {
            return Some(self.samples[idx - 1].1);
        }
        let (m0, v0) = self.samples[idx - 1];
        let (m1, v1) = self.samples[idx];
        Some(v0 + (v1 - v0) * (mjd - m0) / (m1 - m0))
    }
}

impl EarthOrientation for Dut1Table {
    fn dut1(&self, utc: &JulianInstant) -> Result<Seconds> {
        let mjd = utc.mjd();
        self.interpolate(mjd).map(Seconds::new).ok_or_else(|| {
            let (first, last) = self.span();
            Error::source_unavailable(
                "ΔUT1 table",
                format!("MJD {mjd:.3} outside sampled span {first:.1}–{last:.1}"),
            )
        })
    }
}
