// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use trip_activities::db::{
    ActivityFilter, ActivityPatch, ActivityStore, FirestoreDb, MemoryDb, StoreError, Versioned,
};
use trip_activities::models::{Activity, BasicUser, GeoPoint, NewActivity, Revision};
use trip_activities::services::{ActivityService, RetryPolicy};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Retry policy without sleeps or deadline, for deterministic tests.
#[allow(dead_code)]
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
        deadline: None,
    }
}

/// Activity service over a fresh in-memory store.
#[allow(dead_code)]
pub fn memory_service() -> (ActivityService, MemoryDb) {
    let db = MemoryDb::new();
    let service = ActivityService::new(
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        fast_policy(16),
        chrono_tz::Tz::UTC,
    );
    (service, db)
}

#[allow(dead_code)]
pub fn new_activity(name: &str, interests: &[&str]) -> NewActivity {
    NewActivity {
        vendor_id: "vendor-1".to_string(),
        name: name.to_string(),
        description: "A shared outing".to_string(),
        price: 35.0,
        thumbnail_url: "https://example.com/thumb.jpg".to_string(),
        external_url: "https://example.com/reviews".to_string(),
        duration_hours: 3.0,
        is_evening: false,
        location: GeoPoint {
            latitude: 37.39,
            longitude: -122.08,
        },
        interests: interests.iter().map(|s| s.to_string()).collect(),
    }
}

#[allow(dead_code)]
pub fn user(id: &str, first_name: &str) -> BasicUser {
    BasicUser {
        id: id.to_string(),
        first_name: first_name.to_string(),
        last_name: "Traveler".to_string(),
        profile_picture: None,
    }
}

/// Store whose conditional writes always lose the race.
#[allow(dead_code)]
pub struct AlwaysConflictStore {
    pub inner: MemoryDb,
    pub gets: AtomicUsize,
    pub writes: AtomicUsize,
}

#[allow(dead_code)]
impl AlwaysConflictStore {
    pub fn new(inner: MemoryDb) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ActivityStore for AlwaysConflictStore {
    async fn insert(&self, activity: &Activity) -> Result<(), StoreError> {
        self.inner.insert(activity).await
    }

    async fn get(&self, id: &str) -> Result<Versioned<Activity>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn conditional_update(
        &self,
        id: &str,
        _expected: Revision,
        _patch: &ActivityPatch,
    ) -> Result<Revision, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Conflict { id: id.to_string() })
    }

    async fn query(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, StoreError> {
        self.inner.query(filter).await
    }
}

/// Store that holds the first `parties` reads at a barrier, so that many
/// writers observe the same revision before any of them writes.
#[allow(dead_code)]
pub struct LockstepStore {
    pub inner: MemoryDb,
    parties: usize,
    barrier: Barrier,
    gets: AtomicUsize,
    pub conflicts: AtomicUsize,
}

#[allow(dead_code)]
impl LockstepStore {
    pub fn new(inner: MemoryDb, parties: usize) -> Self {
        Self {
            inner,
            parties,
            barrier: Barrier::new(parties),
            gets: AtomicUsize::new(0),
            conflicts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ActivityStore for LockstepStore {
    async fn insert(&self, activity: &Activity) -> Result<(), StoreError> {
        self.inner.insert(activity).await
    }

    async fn get(&self, id: &str) -> Result<Versioned<Activity>, StoreError> {
        let n = self.gets.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.get(id).await;
        if n < self.parties {
            self.barrier.wait().await;
        }
        result
    }

    async fn conditional_update(
        &self,
        id: &str,
        expected: Revision,
        patch: &ActivityPatch,
    ) -> Result<Revision, StoreError> {
        let result = self.inner.conditional_update(id, expected, patch).await;
        if matches!(result, Err(StoreError::Conflict { .. })) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn query(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, StoreError> {
        self.inner.query(filter).await
    }
}

/// Store whose conditional writes land immediately but are acknowledged
/// only after `ack_delay`.
#[allow(dead_code)]
pub struct SlowAckStore {
    pub inner: MemoryDb,
    ack_delay: Duration,
}

#[allow(dead_code)]
impl SlowAckStore {
    pub fn new(inner: MemoryDb, ack_delay: Duration) -> Self {
        Self { inner, ack_delay }
    }
}

#[async_trait]
impl ActivityStore for SlowAckStore {
    async fn insert(&self, activity: &Activity) -> Result<(), StoreError> {
        self.inner.insert(activity).await
    }

    async fn get(&self, id: &str) -> Result<Versioned<Activity>, StoreError> {
        self.inner.get(id).await
    }

    async fn conditional_update(
        &self,
        id: &str,
        expected: Revision,
        patch: &ActivityPatch,
    ) -> Result<Revision, StoreError> {
        let result = self.inner.conditional_update(id, expected, patch).await;
        tokio::time::sleep(self.ack_delay).await;
        result
    }

    async fn query(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, StoreError> {
        self.inner.query(filter).await
    }
}
