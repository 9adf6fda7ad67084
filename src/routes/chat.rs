// SPDX-License-Identifier: MIT

//! Chat/video token route.

use crate::error::Result;
use crate::middleware::auth::{require_user, Identity};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat/token", get(get_token))
}

/// Token response consumed directly by the browser SDKs.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: Option<String>,
}

/// Mint a provider access token for both video and chat.
async fn get_token(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<TokenResponse>> {
    let user = require_user(&state.db, &identity).await?;
    let token = state.stream.create_user_token(&user.external_id)?;

    Ok(Json(TokenResponse {
        token,
        user_id: user.external_id,
        user_name: user.name,
        user_image: user.profile_image,
    }))
}
