// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-side projections of an activity.
//!
//! None of these carry the revision token.

use serde::Serialize;

use crate::models::{Activity, BasicUser, ChatMessage, GeoPoint};
use crate::time_utils::format_utc_rfc3339;

/// Descriptive fields only; used for list and search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicActivityView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub thumbnail_url: String,
    pub external_url: String,
    pub duration_hours: f64,
    pub is_evening: bool,
    pub time_period: TimePeriodView,
    pub location: GeoPoint,
    pub interests: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimePeriodView {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageView {
    pub user: BasicUser,
    pub text: String,
    pub created_at: String,
}

/// Full view; private content only when the requesting trip is committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedActivityView {
    #[serde(flatten)]
    pub activity: BasicActivityView,
    pub is_committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed_users: Option<Vec<BasicUser>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_chat: Option<Vec<ChatMessageView>>,
}

impl From<&Activity> for BasicActivityView {
    fn from(activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            name: activity.name.clone(),
            description: activity.description.clone(),
            price: activity.price,
            thumbnail_url: activity.thumbnail_url.clone(),
            external_url: activity.external_url.clone(),
            duration_hours: activity.duration_hours,
            is_evening: activity.is_evening,
            time_period: TimePeriodView {
                start: format_utc_rfc3339(activity.time_period.start),
                end: format_utc_rfc3339(activity.time_period.end),
            },
            location: activity.location,
            interests: activity.interests.clone(),
            created_at: format_utc_rfc3339(activity.created_at),
            updated_at: format_utc_rfc3339(activity.updated_at),
        }
    }
}

impl From<&ChatMessage> for ChatMessageView {
    fn from(message: &ChatMessage) -> Self {
        Self {
            user: message.author.clone(),
            text: message.text.clone(),
            created_at: format_utc_rfc3339(message.created_at),
        }
    }
}
