// SPDX-License-Identifier: MIT

//! Stream (video/chat provider) server-side API client.
//!
//! Handles:
//! - Per-user access token minting (JWT over the API secret)
//! - Video call create / hard delete
//! - Chat channel create / add member / delete
//! - User registry upsert / delete
//!
//! Remote calls carry a bounded timeout so a slow provider cannot hang
//! a request; failures surface as `AppError::Provider`. When no API
//! credentials are configured the adapter runs offline and remote
//! operations become logged no-ops. Token minting stays local either way.

use crate::error::AppError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::time::Duration;

const PROVIDER_TIMEOUT_SECS: u64 = 10;
/// Server-to-server auth tokens are short-lived.
const SERVER_TOKEN_TTL_SECS: usize = 5 * 60;

/// Stream API client.
#[derive(Clone)]
pub struct StreamService {
    api_key: String,
    api_secret: Vec<u8>,
    http: Option<reqwest::Client>,
    base_url: String,
}

/// Claims for per-user access tokens consumed by the browser SDKs.
#[derive(Serialize)]
struct UserTokenClaims {
    user_id: String,
    iat: usize,
}

/// Claims for server-side API calls.
#[derive(Serialize)]
struct ServerTokenClaims {
    server: bool,
    iat: usize,
    exp: usize,
}

impl StreamService {
    /// Create a client with live HTTP access to the Stream API.
    pub fn new(api_key: String, api_secret: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .ok();

        Self {
            api_key,
            api_secret: api_secret.into_bytes(),
            http,
            base_url: "https://chat.stream-io-api.com".to_string(),
        }
    }

    /// Offline client: remote operations are logged no-ops.
    ///
    /// Used when STREAM_API_KEY/SECRET are not configured and by tests.
    pub fn new_offline(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret: api_secret.into_bytes(),
            http: None,
            base_url: "https://chat.stream-io-api.com".to_string(),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.http.is_none()
    }

    // ─── Tokens ──────────────────────────────────────────────────

    /// Mint an access token the browser uses for both video and chat.
    pub fn create_user_token(&self, external_id: &str) -> Result<String, AppError> {
        let claims = UserTokenClaims {
            user_id: external_id.to_string(),
            iat: unix_now()?,
        };
        self.sign(&claims)
    }

    fn server_token(&self) -> Result<String, AppError> {
        let now = unix_now()?;
        let claims = ServerTokenClaims {
            server: true,
            iat: now,
            exp: now + SERVER_TOKEN_TTL_SECS,
        };
        self.sign(&claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AppError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.api_secret),
        )
        .map_err(|e| AppError::Provider(format!("Token signing failed: {}", e)))
    }

    // ─── Video Calls ─────────────────────────────────────────────

    /// Create the video call backing a session.
    pub async fn create_call(
        &self,
        call_id: &str,
        created_by: &str,
        session_id: &str,
        problem: &str,
        difficulty: &str,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({
            "data": {
                "created_by_id": created_by,
                "custom": {
                    "session_id": session_id,
                    "problem": problem,
                    "difficulty": difficulty,
                },
            },
        });
        self.post(&format!("/video/call/default/{}", call_id), &body)
            .await
    }

    /// Hard-delete the video call when a session ends.
    pub async fn delete_call(&self, call_id: &str) -> Result<(), AppError> {
        let body = serde_json::json!({ "hard": true });
        self.post(&format!("/video/call/default/{}/delete", call_id), &body)
            .await
    }

    // ─── Chat Channels ───────────────────────────────────────────

    /// Create the chat channel for a session with the host as sole member.
    pub async fn create_channel(
        &self,
        call_id: &str,
        created_by: &str,
        name: &str,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({
            "data": {
                "name": name,
                "created_by_id": created_by,
                "members": [created_by],
            },
        });
        self.post(&format!("/channels/messaging/{}/query", call_id), &body)
            .await
    }

    /// Add a joining participant to the session's chat channel.
    pub async fn add_channel_member(
        &self,
        call_id: &str,
        external_id: &str,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({ "add_members": [external_id] });
        self.post(&format!("/channels/messaging/{}", call_id), &body)
            .await
    }

    /// Delete the session's chat channel.
    pub async fn delete_channel(&self, call_id: &str) -> Result<(), AppError> {
        self.delete(&format!("/channels/messaging/{}", call_id))
            .await
    }

    // ─── User Registry ───────────────────────────────────────────

    /// Register or update a user with the provider.
    pub async fn upsert_user(
        &self,
        external_id: &str,
        name: &str,
        image: Option<&str>,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({
            "users": {
                external_id: {
                    "id": external_id,
                    "name": name,
                    "image": image,
                },
            },
        });
        self.post("/users", &body).await
    }

    /// Remove a user from the provider registry.
    pub async fn delete_user(&self, external_id: &str) -> Result<(), AppError> {
        let body = serde_json::json!({ "user_ids": [external_id] });
        self.post("/users/delete", &body).await
    }

    // ─── Transport ───────────────────────────────────────────────

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<(), AppError> {
        let Some(http) = &self.http else {
            tracing::debug!(path, "Stream offline, skipping POST");
            return Ok(());
        };

        let response = http
            .post(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str())])
            .header("stream-auth-type", "jwt")
            .header("Authorization", self.server_token()?)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        self.check_response(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        let Some(http) = &self.http else {
            tracing::debug!(path, "Stream offline, skipping DELETE");
            return Ok(());
        };

        let response = http
            .delete(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str())])
            .header("stream-auth-type", "jwt")
            .header("Authorization", self.server_token()?)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        self.check_response(response).await
    }

    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Provider(format!("Stream API {}: {}", status, body)))
    }
}

fn unix_now() -> Result<usize, AppError> {
    use std::time::{SystemTime, UNIX_EPOCH};
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_secs() as usize)
}
