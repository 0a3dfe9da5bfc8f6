// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Group chat messages attached to an activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::BasicUser;

/// Longest accepted chat message, in characters.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 2000;

/// One entry of an activity's group chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author, denormalised at post time
    pub author: BasicUser,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
