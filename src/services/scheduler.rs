// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Time-window assignment for new activities.
//!
//! A candidate start is drawn a few days ahead of "now", truncated to the top
//! of the local hour, and daytime windows are shifted into 08:00-18:00.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use rand::Rng;

use crate::models::TimePeriod;
use crate::time_utils::{hours, truncate_to_hour};

/// Earliest local start hour for daytime activities.
pub const DAY_START_HOUR: i64 = 8;
/// Latest local end hour for daytime activities.
pub const DAY_END_HOUR: i64 = 18;

/// Candidate starts fall 1..=6 days ahead.
const HORIZON_DAYS: std::ops::RangeInclusive<i64> = 1..=6;
/// Hour jitter applied around the candidate day.
const HOUR_JITTER: std::ops::RangeInclusive<i64> = -3..=2;

/// Compute the window for an activity of `duration_hours`.
///
/// `now` carries the scheduling time zone; daytime bounds are evaluated on
/// the local date of the candidate start. The duration must already be
/// validated (see `NewActivity`).
pub fn schedule<Tz, R>(
    now: DateTime<Tz>,
    duration_hours: f64,
    is_evening: bool,
    rng: &mut R,
) -> TimePeriod
where
    Tz: TimeZone,
    R: Rng + ?Sized,
{
    let duration = hours(duration_hours);
    let days = rng.gen_range(HORIZON_DAYS);
    let jitter = rng.gen_range(HOUR_JITTER);

    let candidate = now + TimeDelta::days(days) + TimeDelta::hours(jitter);
    let start = truncate_to_hour(candidate);

    let start = if is_evening {
        start
    } else {
        clamp_to_daytime(start, duration)
    };

    TimePeriod::from_start(start.with_timezone(&Utc), duration)
}

/// Shift a window by the minimal amount that fits it into the local day.
fn clamp_to_daytime<Tz: TimeZone>(start: DateTime<Tz>, duration: TimeDelta) -> DateTime<Tz> {
    let tz = start.timezone();
    let date = start.date_naive();
    let day_start = local_time(&tz, date, DAY_START_HOUR);
    let day_end = local_time(&tz, date, DAY_END_HOUR);

    let end = start.clone() + duration;
    if end > day_end {
        start - (end - day_end)
    } else if start < day_start {
        let shift = day_start - start.clone();
        start + shift
    } else {
        start
    }
}

/// `hour:00` on `date` in `tz`, skipping forward over a DST gap.
fn local_time<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: i64) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN) + TimeDelta::hours(hour);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}
