// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod mutation;
pub mod projection;
pub mod scheduler;

pub use activity::ActivityService;
pub use mutation::{ActivityMutator, CommitOutcome, RetryPolicy};
pub use projection::ProjectionBuilder;
