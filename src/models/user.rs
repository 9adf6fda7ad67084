// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in the `users` collection.
///
/// The external identity id doubles as the document id, which gives
/// us the uniqueness guarantee without a separate index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identity-provider user id (also used as document ID)
    pub external_id: String,
    /// Display name
    pub name: String,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    /// Profile picture URL
    pub profile_image: Option<String>,
    /// When the user was first synced (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

/// Display-relevant user fields embedded in session views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub profile_image: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            external_id: user.external_id,
            name: user.name,
            email: user.email,
            profile_image: user.profile_image,
        }
    }
}

impl UserSummary {
    /// Placeholder for a referenced user whose record no longer exists
    /// (deleted account referenced by an old session).
    pub fn placeholder(external_id: &str) -> Self {
        Self {
            external_id: external_id.to_string(),
            name: "User".to_string(),
            email: None,
            profile_image: None,
        }
    }
}

/// Derive a display name from identity-provider name parts.
///
/// First and last name joined, falling back to a default when both
/// are blank.
pub fn display_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    let joined = format!(
        "{} {}",
        first_name.unwrap_or_default(),
        last_name.unwrap_or_default()
    );
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        "User".to_string()
    } else {
        trimmed.to_string()
    }
}
