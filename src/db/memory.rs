// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for tests and local development.
//!
//! Each conditional update runs under the DashMap shard lock for its entry,
//! which makes the revision compare-and-set atomic.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::db::{
    collections, ActivityFilter, ActivityPatch, ActivityStore, StoreError, TripDirectory,
    Versioned,
};
use crate::models::{Activity, BasicUser, Revision, Trip};

/// Shared in-memory collections. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryDb {
    activities: Arc<DashMap<String, Activity>>,
    trips: Arc<DashMap<String, Trip>>,
    users: Arc<DashMap<String, BasicUser>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_trip(&self, trip: Trip) {
        self.trips.insert(trip.id.clone(), trip);
    }

    pub fn upsert_user(&self, user: BasicUser) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }
}

#[async_trait]
impl ActivityStore for MemoryDb {
    async fn insert(&self, activity: &Activity) -> Result<(), StoreError> {
        match self.activities.entry(activity.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                collection: collections::ACTIVITIES,
                id: activity.id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(activity.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Versioned<Activity>, StoreError> {
        let record = self
            .activities
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::activity_not_found(id))?;
        Ok(Versioned {
            revision: record.revision,
            record,
        })
    }

    async fn conditional_update(
        &self,
        id: &str,
        expected: Revision,
        patch: &ActivityPatch,
    ) -> Result<Revision, StoreError> {
        let mut entry = self
            .activities
            .get_mut(id)
            .ok_or_else(|| StoreError::activity_not_found(id))?;

        if entry.revision != expected {
            return Err(StoreError::Conflict { id: id.to_string() });
        }

        let next = expected.next();
        patch.apply_to(entry.value_mut(), next);
        Ok(next)
    }

    async fn query(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, StoreError> {
        Ok(self
            .activities
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[async_trait]
impl TripDirectory for MemoryDb {
    async fn trips(&self, trip_ids: &[String]) -> Result<Vec<Trip>, StoreError> {
        Ok(trip_ids
            .iter()
            .filter_map(|id| self.trips.get(id).map(|t| t.value().clone()))
            .collect())
    }

    async fn basic_users(&self, user_ids: &[String]) -> Result<Vec<BasicUser>, StoreError> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect())
    }
}
