// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.

use std::env;

/// Deployment environment flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw {
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Deployment environment (relaxes CORS in development)
    pub environment: Environment,
    /// Browser client origin allowed for cross-origin requests
    pub client_url: String,
    /// GCP project ID for Firestore. Absent means the in-memory
    /// fallback store is used (non-production mode).
    pub gcp_project_id: Option<String>,
    /// HMAC key authenticating identity-provider lifecycle events
    pub event_signing_key: Vec<u8>,
    /// Stream API key (public)
    pub stream_api_key: Option<String>,
    /// Stream API secret (signs provider access tokens)
    pub stream_api_secret: Option<String>,
    /// Identity-provider secret verifying caller identity tokens
    pub identity_secret_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only the identity secret is mandatory; everything else has a
    /// development default or triggers an explicit degraded mode.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),
            environment: Environment::parse(
                &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            ),
            client_url: env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").ok().filter(|v| !v.is_empty()),
            event_signing_key: env::var("EVENT_SIGNING_KEY")
                .unwrap_or_else(|_| "dev-event-signing-key".to_string())
                .into_bytes(),
            stream_api_key: env::var("STREAM_API_KEY").ok().filter(|v| !v.is_empty()),
            stream_api_secret: env::var("STREAM_API_SECRET").ok().filter(|v| !v.is_empty()),
            identity_secret_key: env::var("IDENTITY_SECRET_KEY")
                .map_err(|_| ConfigError::Missing("IDENTITY_SECRET_KEY"))?
                .into_bytes(),
        })
    }

    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            port: 3001,
            environment: Environment::Development,
            client_url: "http://localhost:5173".to_string(),
            gcp_project_id: None,
            event_signing_key: b"test-event-signing-key".to_vec(),
            stream_api_key: Some("test_stream_key".to_string()),
            stream_api_secret: Some("test_stream_secret_32_bytes_min!".to_string()),
            identity_secret_key: b"test_identity_key_32_bytes_min!!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
