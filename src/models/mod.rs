// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod chat;
pub mod user;
pub mod views;

pub use activity::{Activity, GeoPoint, NewActivity, Revision, TimePeriod};
pub use chat::ChatMessage;
pub use user::{BasicUser, Trip};
pub use views::{BasicActivityView, ChatMessageView, DetailedActivityView};
