// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Optimistic-concurrency appends to an activity's shared lists.
//!
//! Both operations follow the same loop:
//! 1. Read the record and its revision
//! 2. Compute the new list from what was read
//! 3. Write it conditioned on the observed revision
//! 4. On conflict, back off and start over from 1
//!
//! Every accepted append lands exactly once; a writer that loses a race
//! re-reads and re-applies its entry on top of the winner's.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::time::Instant;

use crate::config::Config;
use crate::db::{ActivityPatch, ActivityStore, StoreError};
use crate::error::{AppError, Result};
use crate::models::chat::MAX_CHAT_MESSAGE_CHARS;
use crate::models::{Activity, BasicUser, ChatMessage, Revision};

/// Bounds on the conflict retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Conditional writes attempted before giving up.
    pub max_attempts: u32,
    /// First back-off delay; doubles per attempt with full jitter.
    pub base_delay: Duration,
    /// Wall-clock limit checked between attempts; an issued write is never abandoned.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(10),
            deadline: Some(Duration::from_secs(2)),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.mutation_max_attempts.max(1),
            base_delay: Duration::from_millis(config.mutation_retry_base_ms),
            deadline: config.mutation_deadline_ms.map(Duration::from_millis),
        }
    }

    /// Back-off before attempt `attempt + 1`, capped at 32x the base.
    fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.base_delay * 2u32.pow(attempt.saturating_sub(1).min(5));
        let ceiling_ms = ceiling.as_millis() as u64;
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling_ms))
    }
}

/// Result of a trip commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub committed_count: usize,
    pub revision: Revision,
    /// False when the trip was already committed.
    pub newly_committed: bool,
}

/// What a single pass of the loop decided to do.
enum Step {
    /// Nothing to write; the desired state is already stored.
    AlreadyApplied,
    Write(ActivityPatch),
}

/// Outcome of the retry loop.
struct Applied {
    /// Record as stored after the operation.
    activity: Activity,
    revision: Revision,
    written: bool,
}

/// Append engine for committed trips and chat messages.
#[derive(Clone)]
pub struct ActivityMutator {
    store: Arc<dyn ActivityStore>,
    policy: RetryPolicy,
}

impl ActivityMutator {
    pub fn new(store: Arc<dyn ActivityStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Commit a trip to an activity. Idempotent per trip id.
    pub async fn commit_trip(&self, activity_id: &str, trip_id: &str) -> Result<CommitOutcome> {
        require_id("activity id", activity_id)?;
        require_id("trip id", trip_id)?;

        let applied = self
            .apply_with_retry(activity_id, "commit_trip", |activity| {
                if activity.is_committed(trip_id) {
                    return Step::AlreadyApplied;
                }
                let mut ids = Vec::with_capacity(activity.committed_trip_ids.len() + 1);
                ids.push(trip_id.to_string());
                ids.extend(activity.committed_trip_ids.iter().cloned());
                Step::Write(ActivityPatch::committed_trip_ids(ids, Utc::now()))
            })
            .await?;

        if applied.written {
            tracing::info!(
                activity_id,
                trip_id,
                revision = %applied.revision,
                committed = applied.activity.committed_trip_ids.len(),
                "Trip committed"
            );
        } else {
            tracing::debug!(activity_id, trip_id, "Trip already committed (idempotent skip)");
        }

        Ok(CommitOutcome {
            committed_count: applied.activity.committed_trip_ids.len(),
            revision: applied.revision,
            newly_committed: applied.written,
        })
    }

    /// Prepend a message to the group chat. Identical messages are all kept.
    pub async fn post_chat_message(
        &self,
        activity_id: &str,
        author: BasicUser,
        text: &str,
    ) -> Result<ChatMessage> {
        require_id("activity id", activity_id)?;
        require_id("author id", &author.id)?;
        if text.trim().is_empty() {
            return Err(AppError::Validation("Chat message is empty".to_string()));
        }
        if text.chars().count() > MAX_CHAT_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Chat message exceeds {} characters",
                MAX_CHAT_MESSAGE_CHARS
            )));
        }

        let applied = self
            .apply_with_retry(activity_id, "post_chat_message", |activity| {
                let now = Utc::now();
                let message = ChatMessage {
                    author: author.clone(),
                    text: text.to_string(),
                    created_at: now,
                };
                let mut chat = Vec::with_capacity(activity.group_chat.len() + 1);
                chat.push(message);
                chat.extend(activity.group_chat.iter().cloned());
                Step::Write(ActivityPatch::group_chat(chat, now))
            })
            .await?;

        let message = applied.activity.group_chat.into_iter().next().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Chat write succeeded without a message"))
        })?;

        tracing::info!(
            activity_id,
            author_id = %message.author.id,
            revision = %applied.revision,
            "Chat message posted"
        );

        Ok(message)
    }

    /// Run the read / decide / conditional-write loop.
    ///
    /// The deadline is checked only between attempts. A conditional write
    /// that has been issued is always awaited, so a write that lands is
    /// never reported as a failure.
    async fn apply_with_retry<F>(
        &self,
        activity_id: &str,
        operation: &'static str,
        mut step: F,
    ) -> Result<Applied>
    where
        F: FnMut(&Activity) -> Step + Send,
    {
        let deadline = self.policy.deadline.map(|limit| Instant::now() + limit);
        let mut attempts = 0;

        while attempts < self.policy.max_attempts {
            if attempts > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(
                    activity_id,
                    operation,
                    attempts,
                    "Mutation deadline exceeded"
                );
                return Err(AppError::ConflictExceeded {
                    activity_id: activity_id.to_string(),
                    attempts,
                });
            }
            attempts += 1;

            let current = self.store.get(activity_id).await?;
            let mut activity = current.record;

            let patch = match step(&activity) {
                Step::AlreadyApplied => {
                    return Ok(Applied {
                        activity,
                        revision: current.revision,
                        written: false,
                    });
                }
                Step::Write(patch) => patch,
            };

            match self
                .store
                .conditional_update(activity_id, current.revision, &patch)
                .await
            {
                Ok(revision) => {
                    patch.apply_to(&mut activity, revision);
                    return Ok(Applied {
                        activity,
                        revision,
                        written: true,
                    });
                }
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(
                        activity_id,
                        operation,
                        attempt = attempts,
                        observed = %current.revision,
                        "Revision conflict, retrying"
                    );
                    if attempts < self.policy.max_attempts {
                        let mut delay = self.policy.backoff(attempts);
                        if let Some(d) = deadline {
                            delay = delay.min(d.saturating_duration_since(Instant::now()));
                        }
                        if delay.is_zero() {
                            tokio::task::yield_now().await;
                        } else {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            activity_id,
            operation,
            attempts,
            "Conflict retries exhausted"
        );
        Err(AppError::ConflictExceeded {
            activity_id: activity_id.to_string(),
            attempts,
        })
    }
}

fn require_id(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("Missing {}", what)));
    }
    Ok(())
}
