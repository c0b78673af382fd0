//! Core value types with validation.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::TimeDelta;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Pre-compiled pattern for `minutes:seconds` durations.
static MINUTES_SECONDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+):([0-5][0-9])$").unwrap());

/// A contraction intensity rating in the range \[1, 5\].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    /// Lightest rating.
    pub const MIN: Self = Self(1);

    /// Heaviest rating.
    pub const MAX: Self = Self(5);

    /// The rating applied when none is given.
    pub const MEDIUM: Self = Self(3);

    /// Creates an intensity after range validation.
    ///
    /// Out-of-range values are rejected, never clamped.
    pub fn new(value: i64) -> Result<Self, TrackerError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN.0..=Self::MAX.0).contains(v))
            .map(Self)
            .ok_or(TrackerError::InvalidIntensity { value })
    }

    /// Validates an optional rating, falling back to [`Intensity::MEDIUM`].
    pub fn or_default(value: Option<i64>) -> Result<Self, TrackerError> {
        value.map_or(Ok(Self::MEDIUM), Self::new)
    }

    /// Returns the numeric rating.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Human-readable label for the rating.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self.0 {
            1 => "Light",
            2 => "Mild",
            4 => "Strong",
            5 => "Heavy",
            _ => "Medium",
        }
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl TryFrom<i64> for Intensity {
    type Error = TrackerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Intensity> for u8 {
    fn from(intensity: Intensity) -> Self {
        intensity.0
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.0, self.label())
    }
}

/// A validated, strictly positive duration for manual entry and edits.
///
/// Parses either whole seconds (`"90"`) or `minutes:seconds` (`"1:30"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManualDuration(i64);

impl ManualDuration {
    /// Creates a duration from a whole number of seconds.
    pub fn from_seconds(seconds: i64) -> Result<Self, TrackerError> {
        if seconds <= 0 || TimeDelta::try_seconds(seconds).is_none() {
            return Err(TrackerError::InvalidDuration {
                input: seconds.to_string(),
            });
        }
        Ok(Self(seconds))
    }

    /// Returns the duration in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        self.0
    }

    /// Returns the duration as a chrono delta.
    #[must_use]
    pub fn as_delta(self) -> TimeDelta {
        // Range checked in `from_seconds`.
        TimeDelta::try_seconds(self.0).unwrap_or(TimeDelta::MAX)
    }

    fn parse_minutes_seconds(input: &str) -> Result<Self, TrackerError> {
        let invalid_format = || TrackerError::InvalidFormat {
            input: input.to_string(),
        };
        let caps = MINUTES_SECONDS_RE.captures(input).ok_or_else(invalid_format)?;
        let minutes: i64 = caps[1].parse().map_err(|_| invalid_format())?;
        let seconds: i64 = caps[2].parse().map_err(|_| invalid_format())?;
        let total = minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(seconds))
            .ok_or_else(invalid_format)?;
        Self::from_seconds(total).map_err(|_| TrackerError::InvalidDuration {
            input: input.to_string(),
        })
    }
}

impl FromStr for ManualDuration {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.contains(':') {
            return Self::parse_minutes_seconds(input);
        }
        let seconds: i64 = input.parse().map_err(|_| TrackerError::InvalidDuration {
            input: input.to_string(),
        })?;
        Self::from_seconds(seconds).map_err(|_| TrackerError::InvalidDuration {
            input: input.to_string(),
        })
    }
}
