// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Leap-second schedule (TAI − UTC).
//!
//! The schedule is read from the line-oriented `leap-seconds.list` format
//! published by the IERS and mirrored by the IETF:
//!
//! ```text
//! #$  3960921600            last update   (NTP seconds)
//! #@  3991593600            expiry        (NTP seconds)
//! 2272060800  10  # 1 Jan 1972
//! 3692217600  37  # 1 Jan 2017
//! ```
//!
//! NTP seconds count from 1900-01-01 00:00:00 UTC (JD 2 415 020.5).  A copy
//! of the list ships with the crate ([`LeapSecondTable::builtin`]); fresher
//! copies are obtained through [`LeapSecondStore`](crate::LeapSecondStore).

use crate::error::{Error, Result};
use crate::instant::JulianInstant;
use crate::scales::TimeScale;
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Julian Day Number of the noon preceding the NTP epoch (1900-01-01 00:00 UTC).
const NTP_EPOCH_DAY: i64 = 2_415_020;

const BUILTIN_LIST: &str = include_str!("../data/leap-seconds.list");

static BUILTIN: Lazy<LeapSecondTable> = Lazy::new(|| match LeapSecondTable::parse(BUILTIN_LIST) {
    Ok(table) => table,
    Err(err) => {
        warn!("embedded leap-second list unusable: {}", err);
        LeapSecondTable::empty()
    }
});

/// UTC instant `seconds` after the NTP epoch.
pub(crate) fn ntp_to_instant(seconds: i64) -> JulianInstant {
    JulianInstant::new(
        NTP_EPOCH_DAY + seconds.div_euclid(86_400),
        0.5 + seconds.rem_euclid(86_400) as f64 / 86_400.0,
        TimeScale::UTC,
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// LeapSecondEntry
// ═══════════════════════════════════════════════════════════════════════════

/// One step of the schedule: from `effective` onward, `TAI − UTC` equals
/// `tai_minus_utc` seconds.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeapSecondEntry {
    /// UTC instant the offset takes effect.
    pub effective: JulianInstant,
    /// Cumulative `TAI − UTC` in whole seconds.
    pub tai_minus_utc: i32,
}

impl FromStr for LeapSecondEntry {
    type Err = Error;

    /// Parse a single data line: `<ntp seconds> <tai−utc> [# comment]`.
    fn from_str(line: &str) -> Result<Self> {
        let data = line.split('#').next().unwrap_or_default();
        let mut tokens = data.split_whitespace();
        let (Some(ntp), Some(offset)) = (tokens.next(), tokens.next()) else {
            return Err(Error::MalformedSchedule(format!(
                "expected two columns in {line:?}"
            )));
        };

        let ntp: i64 = ntp
            .parse()
            .map_err(|e| Error::MalformedSchedule(format!("bad timestamp {ntp:?}: {e}")))?;
        let tai_minus_utc: i32 = offset
            .parse()
            .map_err(|e| Error::MalformedSchedule(format!("bad offset {offset:?}: {e}")))?;

        Ok(Self {
            effective: ntp_to_instant(ntp),
            tai_minus_utc,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LeapSecondTable
// ═══════════════════════════════════════════════════════════════════════════

/// Immutable, chronologically sorted leap-second schedule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LeapSecondTable {
    entries: Vec<LeapSecondEntry>,
    expires: Option<JulianInstant>,
    updated: Option<JulianInstant>,
}

impl LeapSecondTable {
    /// Parse a `leap-seconds.list` document.
    ///
    /// Blank lines and `#` comments are skipped, `#@` and `#$` lines set the
    /// expiry and last-update instants.  Data lines that do not parse are
    /// logged at debug level and skipped.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedSchedule`] when no data line parses.
    pub fn parse(text: &str) -> Result<Self> {
        let mut table = Self::empty();

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("#@") {
                table.expires = parse_marker(rest);
                continue;
            }
            if let Some(rest) = line.strip_prefix("#$") {
                table.updated = parse_marker(rest);
                continue;
            }
            if line.starts_with('#') {
                continue;
            }

            match line.parse::<LeapSecondEntry>() {
                Ok(entry) => table.entries.push(entry),
                Err(err) => debug!("skipping leap-second line {}: {}", number + 1, err),
            }
        }

        if table.entries.is_empty() {
            return Err(Error::MalformedSchedule(
                "no leap-second entries found".to_string(),
            ));
        }

        table
            .entries
            .sort_by(|a, b| a.effective.total_cmp(&b.effective));
        debug!(
            "parsed {} leap-second entries (expires {:?})",
            table.entries.len(),
            table.expires.map(|e| e.jd())
        );
        Ok(table)
    }

    /// Parse a UTF-8 encoded `leap-seconds.list` document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::MalformedSchedule(format!("not valid UTF-8: {e}")))?;
        Self::parse(text)
    }

    /// Schedule compiled into the crate (1972 – 2017, 28 entries).
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// A table with no entries: every lookup answers 0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `TAI − UTC` in whole seconds at `instant`.
    ///
    /// Returns the offset of the latest entry whose effective instant is
    /// `≤ instant` (inclusive boundary), or `0` before the first entry.
    /// The query's scale tag is not inspected.
    pub fn lookup(&self, instant: &JulianInstant) -> i32 {
        let idx = self
            .entries
            .partition_point(|e| e.effective.total_cmp(instant) != Ordering::Greater);
        match idx {
            0 => 0,
            i => self.entries[i - 1].tai_minus_utc,
        }
    }

    #[inline]
    pub fn entries(&self) -> &[LeapSecondEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instant after which the publisher no longer vouches for the list.
    #[inline]
    pub fn expires(&self) -> Option<JulianInstant> {
        self.expires
    }

    /// Instant the list was last updated by its publisher.
    #[inline]
    pub fn updated(&self) -> Option<JulianInstant> {
        self.updated
    }

    /// `true` once `now` has reached the list's expiry.  Lists without an
    /// expiry line never expire.
    pub fn is_expired(&self, now: &JulianInstant) -> bool {
        self.expires
            .is_some_and(|expiry| expiry.total_cmp(now) != Ordering::Greater)
    }
}

fn parse_marker(rest: &str) -> Option<JulianInstant> {
    let token = rest.split_whitespace().next()?;
    match token.parse::<i64>() {
        Ok(seconds) => Some(ntp_to_instant(seconds)),
        Err(err) => {
            debug!("ignoring leap-second marker {:?}: {}", token, err);
            None
        }
    }
}
