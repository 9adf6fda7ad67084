// SPDX-License-Identifier: MIT

//! Session routes: thin request/response mapping over the lifecycle
//! service.

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_user, Identity};
use crate::models::SessionView;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/active", get(list_active))
        .route("/api/sessions/mine", get(list_mine))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/join", put(join_session).post(join_session))
        .route("/api/sessions/{id}/end", put(end_session).post(end_session))
}

#[derive(Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, message = "problem is required"))]
    pub problem: String,
    #[validate(length(min = 1, message = "difficulty is required"))]
    pub difficulty: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionView>,
}

#[derive(Serialize)]
pub struct EndSessionResponse {
    pub session: SessionView,
    pub message: String,
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let caller = require_user(&state.db, &identity).await?;
    let session = state
        .sessions
        .create(&caller, &body.problem, &body.difficulty)
        .await?;

    Ok((StatusCode::CREATED, Json(SessionResponse { session })))
}

async fn list_active(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<SessionsResponse>> {
    require_user(&state.db, &identity).await?;
    let sessions = state.sessions.list_active().await?;
    Ok(Json(SessionsResponse { sessions }))
}

async fn list_mine(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<SessionsResponse>> {
    let caller = require_user(&state.db, &identity).await?;
    let sessions = state.sessions.list_mine(&caller).await?;
    Ok(Json(SessionsResponse { sessions }))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>> {
    require_user(&state.db, &identity).await?;
    let session = state.sessions.get(&id).await?;
    Ok(Json(SessionResponse { session }))
}

async fn join_session(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>> {
    let caller = require_user(&state.db, &identity).await?;
    let session = state.sessions.join(&caller, &id).await?;
    Ok(Json(SessionResponse { session }))
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<EndSessionResponse>> {
    let caller = require_user(&state.db, &identity).await?;
    let session = state.sessions.end(&caller, &id).await?;
    Ok(Json(EndSessionResponse {
        session,
        message: "Session ended successfully".to_string(),
    }))
}
