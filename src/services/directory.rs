// SPDX-License-Identifier: MIT

//! User directory sync with the identity provider and Stream.
//!
//! Both the on-demand path (POST /api/user/sync) and the event-driven
//! handlers funnel through here. Local directory writes are the source
//! of truth; provider registration is best-effort and an out-of-sync
//! window is accepted but always logged.

use crate::db::Database;
use crate::error::AppError;
use crate::models::User;
use crate::services::StreamService;

/// Profile fields supplied by the identity provider.
#[derive(Debug, Clone)]
pub struct IdentityProfile {
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub profile_image: Option<String>,
}

/// Find-or-create a directory record for an authenticated identity.
///
/// Idempotent: concurrent syncs for the same external id resolve to a
/// single record. Returns the stored user and whether it was created.
pub async fn sync_user(
    db: &Database,
    stream: &StreamService,
    profile: IdentityProfile,
) -> Result<(User, bool), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let candidate = User {
        external_id: profile.external_id,
        name: profile.name,
        email: profile.email,
        profile_image: profile.profile_image,
        created_at: now.clone(),
        updated_at: now,
    };

    let (user, created) = db.create_user_if_absent(candidate).await?;

    if created {
        tracing::info!(external_id = %user.external_id, "User synced to directory");
        register_with_provider(stream, &user).await;
    }

    Ok((user, created))
}

/// Remove a user from the directory and, best-effort, from the provider.
pub async fn remove_user(
    db: &Database,
    stream: &StreamService,
    external_id: &str,
) -> Result<(), AppError> {
    db.delete_user(external_id).await?;
    tracing::info!(external_id, "User removed from directory");

    if let Err(e) = stream.delete_user(external_id).await {
        // Accepted inconsistency window: the local delete stands.
        tracing::warn!(
            external_id,
            error = %e,
            "Failed to deregister user with Stream, directory and provider out of sync"
        );
    }

    Ok(())
}

/// Best-effort provider registration. Never rolls back the local record.
async fn register_with_provider(stream: &StreamService, user: &User) {
    if let Err(e) = stream
        .upsert_user(&user.external_id, &user.name, user.profile_image.as_deref())
        .await
    {
        tracing::warn!(
            external_id = %user.external_id,
            error = %e,
            "Failed to register user with Stream, directory and provider out of sync"
        );
    }
}
