// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.

use chrono::{DateTime, SecondsFormat, TimeDelta, TimeZone, Timelike, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Zero the minutes, seconds and sub-seconds of a local time.
pub fn truncate_to_hour<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    let past_hour = TimeDelta::minutes(i64::from(date.minute()))
        + TimeDelta::seconds(i64::from(date.second()))
        + TimeDelta::nanoseconds(i64::from(date.nanosecond()));
    date - past_hour
}

/// Convert fractional hours to a duration, rounded to the second.
pub fn hours(value: f64) -> TimeDelta {
    TimeDelta::seconds((value * 3600.0).round() as i64)
}
