// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with stable error codes.

use crate::db::StoreError;

/// Application error type surfaced by every public operation.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Too many concurrent writers on activity {activity_id} ({attempts} attempts)")]
    ConflictExceeded { activity_id: String, attempts: u32 },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::ConflictExceeded { .. } => "conflict_exceeded",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ConflictExceeded { .. } | AppError::StoreUnavailable(_)
        )
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                AppError::NotFound(format!("{} {} not found", collection, id))
            }
            StoreError::AlreadyExists { collection, id } => {
                AppError::Validation(format!("{} {} already exists", collection, id))
            }
            // Only reachable when a conditional write is issued outside the retry loop.
            StoreError::Conflict { id } => AppError::ConflictExceeded {
                activity_id: id,
                attempts: 1,
            },
            StoreError::Unavailable(msg) => {
                tracing::error!(error = %msg, "Store unavailable");
                AppError::StoreUnavailable(msg)
            }
            StoreError::Serialization(msg) => {
                AppError::Internal(anyhow::anyhow!("Stored document malformed: {}", msg))
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, AppError>;
