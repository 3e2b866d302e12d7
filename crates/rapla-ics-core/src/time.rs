//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times,
//! which may be an all-day date, an instant with a known zone, or a floating
//! wall-clock time that still has to be anchored to a zone.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Represents the time of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    /// An all-day event date (no specific time).
    Date(NaiveDate),
    /// A specific instant carrying its zone (UTC is `Tz::UTC`).
    Zoned(DateTime<Tz>),
    /// A wall-clock time without zone information.
    Floating(NaiveDateTime),
}

impl EventTime {
    /// Creates a new `EventTime::Zoned` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::Zoned(dt.with_timezone(&Tz::UTC))
    }

    /// Creates a new `EventTime::Date` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Anchors a wall-clock time in `tz`.
    pub fn from_local(naive: NaiveDateTime, tz: Tz) -> Self {
        Self::Zoned(localize(naive, tz))
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Returns the zoned instant, if this time carries one.
    pub fn as_zoned(&self) -> Option<&DateTime<Tz>> {
        match self {
            Self::Zoned(dt) => Some(dt),
            _ => None,
        }
    }

    /// Re-expresses this time in `tz`.
    ///
    /// Zoned instants are converted (same instant, new representation),
    /// floating times are assumed to already be in `tz`, and all-day dates
    /// are left untouched.
    pub fn in_zone(&self, tz: Tz) -> Self {
        match self {
            Self::Date(date) => Self::Date(*date),
            Self::Zoned(dt) => Self::Zoned(dt.with_timezone(&tz)),
            Self::Floating(naive) => Self::Zoned(localize(*naive, tz)),
        }
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// Floating times and all-day dates are anchored in `tz`.
    pub fn to_utc_datetime(&self, tz: Tz) -> DateTime<Utc> {
        match self {
            Self::Zoned(dt) => dt.with_timezone(&Utc),
            Self::Floating(naive) => localize(*naive, tz).with_timezone(&Utc),
            Self::Date(date) => {
                localize(date.and_time(chrono::NaiveTime::MIN), tz).with_timezone(&Utc)
            }
        }
    }
}

/// Interprets a wall-clock time in `tz`.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times that
/// fall into a DST gap are shifted forward by the gap.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt,
        None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

/// Parses an IANA zone name such as `Europe/Berlin`.
pub fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| format!("unknown time zone '{}': {}", name, e))
}
