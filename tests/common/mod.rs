// SPDX-License-Identifier: MIT

use codepair::config::Config;
use codepair::db::Database;
use codepair::models::User;
use codepair::routes::create_router;
use codepair::services::{SessionService, StreamService};
use codepair::AppState;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Check whether the Firestore emulator is configured.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Connect to the Firestore emulator backend.
#[allow(dead_code)]
pub async fn test_store() -> codepair::db::firestore::FirestoreStore {
    codepair::db::firestore::FirestoreStore::connect("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app with the in-memory store and offline Stream.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = Database::in_memory();
    let stream = StreamService::new_offline(
        config.stream_api_key.clone().unwrap(),
        config.stream_api_secret.clone().unwrap(),
    );
    let sessions = SessionService::new(db.clone(), stream.clone());

    let state = Arc::new(AppState {
        config,
        db,
        stream,
        sessions,
    });

    (create_router(state.clone()), state)
}

/// Mint an identity token the way the identity provider would,
/// signed with the test secret.
#[allow(dead_code)]
pub fn identity_token(external_id: &str, name: Option<&str>) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        sub: external_id.to_string(),
        exp: now + 86400,
        iat: now,
        name: name.map(String::from),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&Config::test_default().identity_secret_key),
    )
    .unwrap()
}

/// Seed a directory record directly in the store.
#[allow(dead_code)]
pub async fn seed_user(state: &Arc<AppState>, external_id: &str, name: &str) -> User {
    let now = chrono::Utc::now().to_rfc3339();
    let user = User {
        external_id: external_id.to_string(),
        name: name.to_string(),
        email: Some(format!("{}@example.com", external_id)),
        profile_image: None,
        created_at: now.clone(),
        updated_at: now,
    };
    let (stored, _) = state.db.create_user_if_absent(user).await.unwrap();
    stored
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
