// SPDX-License-Identifier: MIT

//! User directory routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::Identity;
use crate::models::UserSummary;
use crate::services::directory::{self, IdentityProfile};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/sync", post(sync_user))
        .route("/api/user/me", get(get_me))
}

#[derive(Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: UserSummary,
}

/// On-demand directory sync for the authenticated caller.
///
/// 200 when the record already exists, 201 when it was created.
async fn sync_user(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let profile = IdentityProfile {
        external_id: identity.external_id.clone(),
        name: identity.name.clone().unwrap_or_else(|| "User".to_string()),
        email: identity.email.clone(),
        profile_image: identity.image.clone(),
    };

    let (user, created) = directory::sync_user(&state.db, &state.stream, profile).await?;

    let (status, message) = if created {
        (StatusCode::CREATED, "User synced successfully")
    } else {
        (StatusCode::OK, "User already exists")
    };

    Ok((
        status,
        Json(UserResponse {
            message: message.to_string(),
            user: UserSummary::from(user),
        }),
    ))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: UserSummary,
}

/// Get the caller's directory record.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<MeResponse>> {
    let user = state
        .db
        .find_user(&identity.external_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(MeResponse {
        user: UserSummary::from(user),
    }))
}
