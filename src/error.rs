// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Error type shared by every fallible operation of the crate.
//!
//! | Variant | Raised by | Retry? |
//! |---------|-----------|--------|
//! | [`InvalidDate`](Error::InvalidDate) | calendar input outside its hard bounds | No |
//! | [`UnsupportedScale`](Error::UnsupportedScale) | unknown scale label, missing conversion edge | No |
//! | [`MalformedSchedule`](Error::MalformedSchedule) | leap-second text with no usable entry | No |
//! | [`SourceUnavailable`](Error::SourceUnavailable) | network, cache file, ΔUT1 data out of range | Yes |

use thiserror::Error;

/// Errors raised by calendar conversion, time-scale conversion and
/// reference-data loading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A civil-date component lies outside its hard bounds.
    #[error("invalid date: {field} = {value} is out of range")]
    InvalidDate { field: &'static str, value: f64 },

    /// A time scale outside {UTC, TAI, TT, TDB, UT1}, or a conversion edge
    /// that does not exist.
    #[error("unsupported time scale: {0}")]
    UnsupportedScale(String),

    /// A leap-second schedule yielded no parseable entry.
    #[error("malformed leap-second schedule: {0}")]
    MalformedSchedule(String),

    /// Reference data (leap seconds, ΔUT1) could not be obtained.
    #[error("source unavailable ({location}): {reason}")]
    SourceUnavailable { location: String, reason: String },
}

impl Error {
    pub(crate) fn invalid_date(field: &'static str, value: impl Into<f64>) -> Self {
        Error::InvalidDate {
            field,
            value: value.into(),
        }
    }

    pub(crate) fn source_unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Error::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// `true` for failures that may succeed when the same call is repeated
    /// later (I/O and network problems).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SourceUnavailable { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
