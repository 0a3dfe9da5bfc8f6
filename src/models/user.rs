//! User and trip records consumed from the account collaborator.

use serde::{Deserialize, Serialize};

/// Public user summary (stored in `users`, embedded in chat messages).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicUser {
    /// User ID (also used as document ID)
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Profile picture URL
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// Trip record; only the owner link matters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    /// Trip ID (also used as document ID)
    pub id: String,
    /// Owning user ID
    pub user_id: String,
}
