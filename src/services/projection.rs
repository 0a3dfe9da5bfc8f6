// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read views built from stored activities.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::db::TripDirectory;
use crate::error::Result;
use crate::models::{
    Activity, BasicActivityView, BasicUser, ChatMessageView, DetailedActivityView,
};

/// Builds basic and detailed views, resolving committed users on demand.
#[derive(Clone)]
pub struct ProjectionBuilder {
    directory: Arc<dyn TripDirectory>,
}

impl ProjectionBuilder {
    pub fn new(directory: Arc<dyn TripDirectory>) -> Self {
        Self { directory }
    }

    pub fn basic_view(activity: &Activity) -> BasicActivityView {
        BasicActivityView::from(activity)
    }

    /// Detailed view for a caller planning `trip_id`.
    ///
    /// Chat and committed users are included only when that trip has
    /// committed to the activity.
    pub async fn detailed_view(
        &self,
        activity: &Activity,
        user_id: &str,
        trip_id: &str,
    ) -> Result<DetailedActivityView> {
        let basic = Self::basic_view(activity);

        if !activity.is_committed(trip_id) {
            tracing::debug!(
                activity_id = %activity.id,
                user_id,
                trip_id,
                "Trip not committed, omitting chat"
            );
            return Ok(DetailedActivityView {
                activity: basic,
                is_committed: false,
                committed_users: None,
                group_chat: None,
            });
        }

        let committed_users = self.committed_users(&activity.committed_trip_ids).await?;
        let group_chat = activity
            .group_chat
            .iter()
            .map(ChatMessageView::from)
            .collect();

        Ok(DetailedActivityView {
            activity: basic,
            is_committed: true,
            committed_users: Some(committed_users),
            group_chat: Some(group_chat),
        })
    }

    /// Owners of the committed trips, one entry per user, in commit order.
    async fn committed_users(&self, trip_ids: &[String]) -> Result<Vec<BasicUser>> {
        if trip_ids.is_empty() {
            return Ok(Vec::new());
        }

        let trips = self.directory.trips(trip_ids).await?;
        let owner_by_trip: HashMap<&str, &str> = trips
            .iter()
            .map(|t| (t.id.as_str(), t.user_id.as_str()))
            .collect();

        let mut seen = HashSet::new();
        let owner_ids: Vec<String> = trip_ids
            .iter()
            .filter_map(|id| owner_by_trip.get(id.as_str()).copied())
            .filter(|owner| seen.insert(*owner))
            .map(str::to_string)
            .collect();

        if owner_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut users: HashMap<String, BasicUser> = self
            .directory
            .basic_users(&owner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(owner_ids
            .iter()
            .filter_map(|id| users.remove(id))
            .collect())
    }
}
