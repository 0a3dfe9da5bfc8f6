// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Activities (insert, get, revision-checked update, queries)
//! - Trips and users (batched lookups for committed-user resolution)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::{FirestoreTimestamp, FirestoreWritePrecondition};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::db::{
    collections, ActivityFilter, ActivityPatch, ActivityStore, StoreError, TripDirectory,
    Versioned,
};
use crate::models::{Activity, BasicUser, ChatMessage, Revision, Trip};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore caps `in` and `array-contains-any` filters at 30 values.
const MAX_FILTER_VALUES: usize = 30;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Revision plus the server write time it was read at.
#[derive(Debug, Deserialize)]
struct RevisionProbe {
    #[serde(default)]
    revision: Revision,
    #[serde(alias = "_firestore_updated")]
    update_time: Option<FirestoreTimestamp>,
}

/// Partial document written by a conditional update.
///
/// Must contain exactly the fields named by `ActivityPatch::field_paths`,
/// since masked fields absent from the object are deleted.
#[derive(Debug, Serialize, Deserialize)]
struct PatchDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    committed_trip_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group_chat: Option<Vec<ChatMessage>>,
    updated_at: DateTime<Utc>,
    revision: Revision,
}

impl PatchDocument {
    fn new(patch: &ActivityPatch, revision: Revision) -> Self {
        Self {
            committed_trip_ids: patch.committed_trip_ids.clone(),
            group_chat: patch.group_chat.clone(),
            updated_at: patch.updated_at,
            revision,
        }
    }
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client.
    ///
    /// All database operations will return `StoreError::Unavailable`.
    pub fn new_offline() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client.as_ref().ok_or_else(|| {
            StoreError::Unavailable("Database not connected (offline mode)".to_string())
        })
    }

    // ─── Trip / User Seeding ─────────────────────────────────────

    /// Create or update a trip record.
    pub async fn upsert_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::TRIPS)
            .document_id(&trip.id)
            .object(trip)
            .execute()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    /// Create or update a user record.
    pub async fn upsert_user(&self, user: &BasicUser) -> Result<(), StoreError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Run one `in` query per chunk of ids, with bounded concurrency.
    async fn query_by_ids<T>(
        &self,
        collection: &'static str,
        ids: &[String],
    ) -> Result<Vec<T>, StoreError>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        let client = self.get_client()?;
        let unique: Vec<String> = dedup(ids);

        let chunks: Vec<Vec<String>> = unique
            .chunks(MAX_FILTER_VALUES)
            .map(|chunk| chunk.to_vec())
            .collect();

        let results = stream::iter(chunks)
            .map(|chunk| async move {
                client
                    .fluent()
                    .select()
                    .from(collection)
                    .filter(move |q| q.field("id").is_in(chunk.clone()))
                    .obj::<T>()
                    .query()
                    .await
                    .map_err(store_error)
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Vec<T>, StoreError>>>()
            .await;

        let mut records = Vec::new();
        for batch in results {
            records.extend(batch?);
        }
        Ok(records)
    }
}

#[async_trait]
impl ActivityStore for FirestoreDb {
    async fn insert(&self, activity: &Activity) -> Result<(), StoreError> {
        let result: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::ACTIVITIES)
            .document_id(&activity.id)
            .object(activity)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(StoreError::AlreadyExists {
                collection: collections::ACTIVITIES,
                id: activity.id.clone(),
            }),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn get(&self, id: &str) -> Result<Versioned<Activity>, StoreError> {
        let record: Option<Activity> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(id)
            .await
            .map_err(store_error)?;

        let record = record.ok_or_else(|| StoreError::activity_not_found(id))?;
        Ok(Versioned {
            revision: record.revision,
            record,
        })
    }

    /// Revision compare-and-set.
    ///
    /// Firestore cannot condition a write on a field value, so the stored
    /// revision is read together with the document's update time and the
    /// write is conditioned on that update time. Any write landing in
    /// between fails the precondition and is reported as a conflict.
    async fn conditional_update(
        &self,
        id: &str,
        expected: Revision,
        patch: &ActivityPatch,
    ) -> Result<Revision, StoreError> {
        let client = self.get_client()?;

        let probe: Option<RevisionProbe> = client
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(id)
            .await
            .map_err(store_error)?;

        let probe = probe.ok_or_else(|| StoreError::activity_not_found(id))?;
        if probe.revision != expected {
            return Err(StoreError::Conflict { id: id.to_string() });
        }
        let update_time = probe.update_time.ok_or_else(|| {
            StoreError::Serialization(format!("activity {} has no update time", id))
        })?;

        let next = expected.next();
        let document = PatchDocument::new(patch, next);

        let result: Result<(), FirestoreError> = client
            .fluent()
            .update()
            .fields(patch.field_paths())
            .in_col(collections::ACTIVITIES)
            .precondition(FirestoreWritePrecondition::UpdateTime(update_time.0))
            .document_id(id)
            .object(&document)
            .execute::<()>()
            .await;

        match result {
            Ok(()) => Ok(next),
            Err(e) if is_precondition_failure(&e) => {
                Err(StoreError::Conflict { id: id.to_string() })
            }
            Err(FirestoreError::DataNotFoundError(_)) => Err(StoreError::activity_not_found(id)),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn query(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, StoreError> {
        let client = self.get_client()?;

        match filter {
            ActivityFilter::CommittedTrip(trip_id) => {
                let trip_id = trip_id.clone();
                client
                    .fluent()
                    .select()
                    .from(collections::ACTIVITIES)
                    .filter(move |q| q.field("committed_trip_ids").array_contains(trip_id.clone()))
                    .obj()
                    .query()
                    .await
                    .map_err(store_error)
            }
            ActivityFilter::AnyInterest(tags) => {
                let chunks: Vec<Vec<String>> = dedup(tags)
                    .chunks(MAX_FILTER_VALUES)
                    .map(|chunk| chunk.to_vec())
                    .collect();

                let results = stream::iter(chunks)
                    .map(|chunk| async move {
                        client
                            .fluent()
                            .select()
                            .from(collections::ACTIVITIES)
                            .filter(move |q| q.field("interests").array_contains_any(chunk.clone()))
                            .obj::<Activity>()
                            .query()
                            .await
                            .map_err(store_error)
                    })
                    .buffer_unordered(MAX_CONCURRENT_DB_OPS)
                    .collect::<Vec<Result<Vec<Activity>, StoreError>>>()
                    .await;

                // An activity can match several chunks.
                let mut seen = HashSet::new();
                let mut activities = Vec::new();
                for batch in results {
                    for activity in batch? {
                        if seen.insert(activity.id.clone()) {
                            activities.push(activity);
                        }
                    }
                }
                Ok(activities)
            }
        }
    }
}

#[async_trait]
impl TripDirectory for FirestoreDb {
    async fn trips(&self, trip_ids: &[String]) -> Result<Vec<Trip>, StoreError> {
        self.query_by_ids(collections::TRIPS, trip_ids).await
    }

    async fn basic_users(&self, user_ids: &[String]) -> Result<Vec<BasicUser>, StoreError> {
        self.query_by_ids(collections::USERS, user_ids).await
    }
}

fn store_error(err: FirestoreError) -> StoreError {
    match err {
        FirestoreError::DeserializeError(e) => StoreError::Serialization(e.to_string()),
        FirestoreError::SerializeError(e) => StoreError::Serialization(e.to_string()),
        other => StoreError::Unavailable(other.to_string()),
    }
}

fn is_precondition_failure(err: &FirestoreError) -> bool {
    if matches!(err, FirestoreError::DataConflictError(_)) {
        return true;
    }
    let msg = err.to_string();
    msg.contains("FailedPrecondition") || msg.contains("FAILED_PRECONDITION")
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}
