// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity service.
//!
//! Entry points used by the request layer:
//! 1. Create an activity (validate, schedule, insert)
//! 2. Commit a trip / post a chat message (via the mutation engine)
//! 3. Detailed view for a caller and list queries returning basic views

use std::sync::{Arc, Mutex};

use chrono::Utc;
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::SeedableRng;
use validator::Validate;

use crate::db::{ActivityFilter, ActivityStore, TripDirectory};
use crate::error::Result;
use crate::models::{
    Activity, BasicActivityView, BasicUser, ChatMessage, DetailedActivityView, NewActivity,
};
use crate::services::mutation::{ActivityMutator, CommitOutcome, RetryPolicy};
use crate::services::projection::ProjectionBuilder;
use crate::services::scheduler;

/// Facade over scheduler, store, mutation engine and projections.
pub struct ActivityService {
    store: Arc<dyn ActivityStore>,
    mutator: ActivityMutator,
    projections: ProjectionBuilder,
    timezone: Tz,
    rng: Mutex<StdRng>,
}

impl ActivityService {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        directory: Arc<dyn TripDirectory>,
        policy: RetryPolicy,
        timezone: Tz,
    ) -> Self {
        Self::with_rng(store, directory, policy, timezone, StdRng::from_entropy())
    }

    /// Same as `new` with a caller-supplied RNG, for reproducible schedules.
    pub fn with_rng(
        store: Arc<dyn ActivityStore>,
        directory: Arc<dyn TripDirectory>,
        policy: RetryPolicy,
        timezone: Tz,
        rng: StdRng,
    ) -> Self {
        Self {
            mutator: ActivityMutator::new(store.clone(), policy),
            projections: ProjectionBuilder::new(directory),
            store,
            timezone,
            rng: Mutex::new(rng),
        }
    }

    pub fn mutator(&self) -> &ActivityMutator {
        &self.mutator
    }

    /// Validate, schedule and insert a new activity.
    pub async fn create_activity(&self, request: NewActivity) -> Result<Activity> {
        request.validate()?;

        let now = Utc::now();
        let time_period = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            scheduler::schedule(
                now.with_timezone(&self.timezone),
                request.duration_hours,
                request.is_evening,
                &mut *rng,
            )
        };

        let id = uuid::Uuid::new_v4().to_string();
        let activity = Activity::from_request(id, request, time_period, now);
        self.store.insert(&activity).await?;

        tracing::info!(
            activity_id = %activity.id,
            vendor_id = %activity.vendor_id,
            start = %activity.time_period.start,
            end = %activity.time_period.end,
            "Activity created"
        );

        Ok(activity)
    }

    pub async fn commit_trip(&self, activity_id: &str, trip_id: &str) -> Result<CommitOutcome> {
        self.mutator.commit_trip(activity_id, trip_id).await
    }

    pub async fn post_chat_message(
        &self,
        activity_id: &str,
        author: BasicUser,
        text: &str,
    ) -> Result<ChatMessage> {
        self.mutator
            .post_chat_message(activity_id, author, text)
            .await
    }

    pub async fn get_detailed_view(
        &self,
        activity_id: &str,
        user_id: &str,
        trip_id: &str,
    ) -> Result<DetailedActivityView> {
        let activity = self.store.get(activity_id).await?.record;
        self.projections
            .detailed_view(&activity, user_id, trip_id)
            .await
    }

    /// Activities the trip has committed to, in itinerary order.
    pub async fn query_committed_for_trip(&self, trip_id: &str) -> Result<Vec<BasicActivityView>> {
        let mut activities = self
            .store
            .query(&ActivityFilter::CommittedTrip(trip_id.to_string()))
            .await?;
        activities.sort_by(|a, b| {
            a.time_period
                .start
                .cmp(&b.time_period.start)
                .then_with(|| a.id.cmp(&b.id))
        });

        tracing::debug!(trip_id, count = activities.len(), "Committed activities");
        Ok(activities.iter().map(ProjectionBuilder::basic_view).collect())
    }

    /// Activities sharing any of the user's interest tags.
    pub async fn query_recommended_for_user(
        &self,
        interest_tags: &[String],
    ) -> Result<Vec<BasicActivityView>> {
        let tags: Vec<String> = interest_tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let mut activities = self.store.query(&ActivityFilter::AnyInterest(tags)).await?;
        activities.sort_by(|a, b| {
            a.time_period
                .start
                .cmp(&b.time_period.start)
                .then_with(|| a.id.cmp(&b.id))
        });

        tracing::debug!(count = activities.len(), "Recommended activities");
        Ok(activities.iter().map(ProjectionBuilder::basic_view).collect())
    }
}
