// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity model for storage and creation requests.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::ChatMessage;
use crate::time_utils::hours;

/// Longest daytime activity that fits between 08:00 and 18:00.
pub const MAX_DAYTIME_HOURS: f64 = 10.0;
/// Shortest schedulable activity, after rounding to whole seconds.
pub const MIN_DURATION_MINUTES: i64 = 1;

/// Optimistic concurrency token for the append-only lists.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Revision assigned by the initial insert.
    pub const INITIAL: Revision = Revision(1);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The revision a successful conditional write produces.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduled window; `end - start` always equals the activity duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimePeriod {
    pub fn from_start(start: DateTime<Utc>, duration: TimeDelta) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct GeoPoint {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Stored activity record in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Opaque id (also used as document ID)
    pub id: String,
    /// Vendor that defines the activity
    pub vendor_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub thumbnail_url: String,
    /// External review/booking link
    pub external_url: String,
    pub duration_hours: f64,
    pub is_evening: bool,
    /// Assigned once by the scheduler at creation
    pub time_period: TimePeriod,
    pub location: GeoPoint,
    /// Interest tags, de-duplicated
    #[serde(default)]
    pub interests: Vec<String>,
    /// Trips committed to this activity, most recent first
    #[serde(default)]
    pub committed_trip_ids: Vec<String>,
    /// Group chat log, most recent first
    #[serde(default)]
    pub group_chat: Vec<ChatMessage>,
    /// Concurrency token; never exposed through views
    #[serde(default)]
    pub revision: Revision,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Build a freshly created record from a validated request.
    pub fn from_request(
        id: String,
        request: NewActivity,
        time_period: TimePeriod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            vendor_id: request.vendor_id,
            name: request.name,
            description: request.description,
            price: request.price,
            thumbnail_url: request.thumbnail_url,
            external_url: request.external_url,
            duration_hours: request.duration_hours,
            is_evening: request.is_evening,
            time_period,
            location: request.location,
            interests: dedup_tags(request.interests),
            committed_trip_ids: Vec::new(),
            group_chat: Vec::new(),
            revision: Revision::INITIAL,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_committed(&self, trip_id: &str) -> bool {
        self.committed_trip_ids.iter().any(|t| t == trip_id)
    }

    pub fn shares_interest(&self, tags: &[String]) -> bool {
        self.interests.iter().any(|i| tags.contains(i))
    }
}

/// Vendor-supplied fields for a new activity.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_schedulable"))]
pub struct NewActivity {
    #[validate(length(min = 1))]
    pub vendor_id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub external_url: String,
    #[validate(range(exclusive_min = 0.0, max = 24.0))]
    pub duration_hours: f64,
    #[serde(default)]
    pub is_evening: bool,
    #[validate(nested)]
    pub location: GeoPoint,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub interests: Vec<String>,
}

fn validate_schedulable(request: &NewActivity) -> Result<(), ValidationError> {
    if !request.duration_hours.is_finite() || !request.price.is_finite() {
        return Err(ValidationError::new("not_finite"));
    }
    if hours(request.duration_hours) < TimeDelta::minutes(MIN_DURATION_MINUTES) {
        let mut err = ValidationError::new("duration_too_short");
        err.message = Some("activities must last at least one minute".into());
        return Err(err);
    }
    if !request.is_evening && request.duration_hours > MAX_DAYTIME_HOURS {
        let mut err = ValidationError::new("daytime_too_long");
        err.message = Some("daytime activities must fit between 08:00 and 18:00".into());
        return Err(err);
    }
    Ok(())
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}
