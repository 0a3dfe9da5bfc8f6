// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Trip Activities: shared activities for collaborative trip planning
//!
//! This crate provides the mutation core behind activity records: time
//! window scheduling, revision-checked appends to the committed-trip list
//! and group chat, and the read views built from them.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod time_utils;

use std::sync::Arc;

use config::{Config, StoreBackend};
use db::{ActivityStore, FirestoreDb, MemoryDb, TripDirectory};
use error::Result;
use services::{ActivityService, RetryPolicy};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub activities: ActivityService,
}

impl AppState {
    /// Connect the configured store and wire the services.
    pub async fn from_config(config: Config) -> Result<Self> {
        let (store, directory): (Arc<dyn ActivityStore>, Arc<dyn TripDirectory>) =
            match config.store_backend {
                StoreBackend::Firestore => {
                    let db = FirestoreDb::new(&config.gcp_project_id).await?;
                    (Arc::new(db.clone()), Arc::new(db))
                }
                StoreBackend::Memory => {
                    tracing::warn!("Using in-memory store; data is not persisted");
                    let db = MemoryDb::new();
                    (Arc::new(db.clone()), Arc::new(db))
                }
            };

        Ok(Self::with_store(config, store, directory))
    }

    /// Wire the services over an existing store.
    pub fn with_store(
        config: Config,
        store: Arc<dyn ActivityStore>,
        directory: Arc<dyn TripDirectory>,
    ) -> Self {
        let activities = ActivityService::new(
            store,
            directory,
            RetryPolicy::from_config(&config),
            config.schedule_timezone,
        );
        Self { config, activities }
    }
}
