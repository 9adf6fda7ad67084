// SPDX-License-Identifier: MIT

//! Identity-provider lifecycle event route.
//!
//! The identity provider pushes account events over a signed webhook:
//! the raw body carries an HMAC-SHA256 hex signature in
//! `x-event-signature`. Handlers are idempotent and best-effort toward
//! the Stream registry; an unparseable but authentic payload is
//! acknowledged so the provider does not retry forever.

use crate::services::directory::{self, IdentityProfile};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-event-signature";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/events/identity", post(handle_event))
}

/// Identity-provider event envelope.
#[derive(Deserialize, Debug)]
struct IdentityEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

/// Account payload; the provider sends the full profile on creation
/// and only the id on deletion.
#[derive(Deserialize, Debug)]
struct EventData {
    id: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Deserialize, Debug)]
struct EmailAddress {
    email_address: String,
}

/// Verify the HMAC-SHA256 hex signature over the raw body.
fn verify_signature(key: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Handle an incoming identity event (POST).
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(&state.config.event_signing_key, &body, signature) {
        tracing::warn!("Identity event rejected: bad or missing signature");
        return StatusCode::UNAUTHORIZED;
    }

    let event: IdentityEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse identity event");
            return StatusCode::OK; // Authentic but malformed; don't trigger retries
        }
    };

    tracing::info!(
        event_type = %event.event_type,
        external_id = %event.data.id,
        "Identity event received"
    );

    match event.event_type.as_str() {
        "user.created" => {
            let profile = IdentityProfile {
                external_id: event.data.id.clone(),
                name: crate::models::user::display_name(
                    event.data.first_name.as_deref(),
                    event.data.last_name.as_deref(),
                ),
                email: event
                    .data
                    .email_addresses
                    .first()
                    .map(|e| e.email_address.clone()),
                profile_image: event.data.image_url.clone(),
            };

            if let Err(e) = directory::sync_user(&state.db, &state.stream, profile).await {
                tracing::error!(
                    external_id = %event.data.id,
                    error = %e,
                    "Failed to sync created user"
                );
            }
        }
        "user.deleted" => {
            if let Err(e) = directory::remove_user(&state.db, &state.stream, &event.data.id).await {
                tracing::error!(
                    external_id = %event.data.id,
                    error = %e,
                    "Failed to remove deleted user"
                );
            }
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled identity event type");
        }
    }

    StatusCode::OK
}
