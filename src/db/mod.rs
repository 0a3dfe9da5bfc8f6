//! Persistence layer: the activity store and the trip/user directory.
//!
//! The mutation core depends only on the traits defined here. Two backends
//! implement them: Firestore for production and an in-process store for
//! tests and local development.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Activity, BasicUser, ChatMessage, Revision, Trip};

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
    pub const TRIPS: &str = "trips";
    pub const USERS: &str = "users";
}

/// Errors raised by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} {id} not found")]
    NotFound { collection: &'static str, id: String },

    #[error("{collection} {id} already exists")]
    AlreadyExists { collection: &'static str, id: String },

    /// The stored revision moved past the expected one.
    #[error("Revision conflict on {id}")]
    Conflict { id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed document: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn activity_not_found(id: &str) -> Self {
        StoreError::NotFound {
            collection: collections::ACTIVITIES,
            id: id.to_string(),
        }
    }
}

/// A record together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub record: T,
    pub revision: Revision,
}

/// Literal replacement values for the append-only fields.
///
/// The store only knows "set field to value"; appending is done by the
/// caller against the revision it observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPatch {
    pub committed_trip_ids: Option<Vec<String>>,
    pub group_chat: Option<Vec<ChatMessage>>,
    pub updated_at: DateTime<Utc>,
}

impl ActivityPatch {
    pub fn committed_trip_ids(ids: Vec<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            committed_trip_ids: Some(ids),
            group_chat: None,
            updated_at,
        }
    }

    pub fn group_chat(chat: Vec<ChatMessage>, updated_at: DateTime<Utc>) -> Self {
        Self {
            committed_trip_ids: None,
            group_chat: Some(chat),
            updated_at,
        }
    }

    /// Firestore field paths written by this patch, revision included.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::with_capacity(4);
        if self.committed_trip_ids.is_some() {
            paths.push("committed_trip_ids");
        }
        if self.group_chat.is_some() {
            paths.push("group_chat");
        }
        paths.push("updated_at");
        paths.push("revision");
        paths
    }

    /// Apply to an in-memory record and stamp the new revision.
    pub fn apply_to(&self, activity: &mut Activity, revision: Revision) {
        if let Some(ids) = &self.committed_trip_ids {
            activity.committed_trip_ids = ids.clone();
        }
        if let Some(chat) = &self.group_chat {
            activity.group_chat = chat.clone();
        }
        activity.updated_at = self.updated_at;
        activity.revision = revision;
    }
}

/// Query predicates supported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityFilter {
    /// Activities whose committed trip list contains this trip.
    CommittedTrip(String),
    /// Activities sharing at least one interest tag.
    AnyInterest(Vec<String>),
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        match self {
            ActivityFilter::CommittedTrip(trip_id) => activity.is_committed(trip_id),
            ActivityFilter::AnyInterest(tags) => activity.shares_interest(tags),
        }
    }
}

/// Gateway to the activities collection.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Unconditional create; fails if the id is already taken.
    async fn insert(&self, activity: &Activity) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Versioned<Activity>, StoreError>;

    /// Compare-and-set on the revision field.
    ///
    /// Applies `patch` and bumps the revision by one only if the stored
    /// revision equals `expected`; otherwise returns `StoreError::Conflict`.
    async fn conditional_update(
        &self,
        id: &str,
        expected: Revision,
        patch: &ActivityPatch,
    ) -> Result<Revision, StoreError>;

    async fn query(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, StoreError>;
}

/// Batched lookups into the trip and user collections.
#[async_trait]
pub trait TripDirectory: Send + Sync {
    /// Trips for the given ids; unknown ids are skipped.
    async fn trips(&self, trip_ids: &[String]) -> Result<Vec<Trip>, StoreError>;

    /// Users for the given ids; unknown ids are skipped.
    async fn basic_users(&self, user_ids: &[String]) -> Result<Vec<BasicUser>, StoreError>;
}
