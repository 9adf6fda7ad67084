// SPDX-License-Identifier: MIT

//! Identity token verification middleware.
//!
//! The identity provider issues HS256 JWTs to the browser; we verify
//! them against the shared secret and inject the caller's identity
//! into the request. The directory record lookup is a separate step
//! because `/api/user/sync` and `/api/user/me` must run for callers
//! who are not in the directory yet.

use crate::db::Database;
use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity token claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (external identity id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Display name, when the provider includes profile claims
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Verified caller identity extracted from the token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub external_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

/// Middleware that requires a valid identity token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    let key = DecodingKey::from_secret(&state.config.identity_secret_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data =
        decode::<Claims>(token, &key, &validation).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let identity = Identity {
        external_id: token_data.claims.sub,
        name: token_data.claims.name,
        email: token_data.claims.email,
        image: token_data.claims.image,
    };
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Resolve the caller's directory record.
///
/// Session and chat routes require it; a verified identity without a
/// record means the client has not called `/api/user/sync` yet.
pub async fn require_user(db: &Database, identity: &Identity) -> Result<User, AppError> {
    db.find_user(&identity.external_id)
        .await?
        .ok_or(AppError::Unauthorized)
}
