// SPDX-License-Identifier: MIT

//! Document store layer.
//!
//! `Database` is an explicitly constructed handle over one of two
//! backends exposing the same operations: the real Firestore store,
//! or a `DashMap`-backed in-memory store used for tests and as the
//! degraded mode when no database is configured or reachable.

pub mod firestore;
pub mod memory;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Session, User};
use ring::rand::{SecureRandom, SystemRandom};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SESSIONS: &str = "sessions";
}

/// Listings are capped at this many results.
pub const LIST_LIMIT: u32 = 20;

/// Generate a random document id (hex, collision-resistant best effort).
pub fn new_document_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 12];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
    Ok(hex::encode(bytes))
}

/// Database handle with an explicit lifecycle: `open()` at startup,
/// cloned into shared state, dropped on shutdown.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreStore),
    Memory(memory::MemoryStore),
}

impl Database {
    /// Open the configured backend.
    ///
    /// Falls back to the in-memory store when no project id is set or
    /// the Firestore connection fails. The fallback is an explicit
    /// degraded mode: it is logged here and reported by `/api/health`.
    pub async fn open(config: &Config) -> Self {
        let Some(project_id) = config.gcp_project_id.as_deref() else {
            tracing::warn!("GCP_PROJECT_ID not set, using in-memory store (non-production mode)");
            return Self::in_memory();
        };

        match firestore::FirestoreStore::connect(project_id).await {
            Ok(store) => Self {
                backend: Backend::Firestore(store),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Firestore unavailable, falling back to in-memory store");
                Self::in_memory()
            }
        }
    }

    /// In-memory store, used directly by tests.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(memory::MemoryStore::new()),
        }
    }

    /// Name of the active backend, reported by the health check.
    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            Backend::Firestore(_) => "firestore",
            Backend::Memory(_) => "memory",
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Look up a user by external identity id.
    pub async fn find_user(&self, external_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.find_user(external_id).await,
            Backend::Memory(mem) => Ok(mem.find_user(external_id)),
        }
    }

    /// Create a user unless one already exists for the same external id.
    ///
    /// Idempotent: the external id is the document id, so a concurrent
    /// duplicate sync cannot produce two records. Returns the stored
    /// user and whether it was newly created.
    pub async fn create_user_if_absent(&self, user: User) -> Result<(User, bool), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.create_user_if_absent(user).await,
            Backend::Memory(mem) => Ok(mem.create_user_if_absent(user)),
        }
    }

    /// Remove a user by external identity id. Idempotent.
    pub async fn delete_user(&self, external_id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.delete_user(external_id).await,
            Backend::Memory(mem) => {
                mem.delete_user(external_id);
                Ok(())
            }
        }
    }

    // ─── Session Operations ──────────────────────────────────────

    /// Persist a newly created session.
    pub async fn create_session(&self, session: &Session) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.create_session(session).await,
            Backend::Memory(mem) => {
                mem.create_session(session);
                Ok(())
            }
        }
    }

    /// Fetch a session by id.
    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.get_session(id).await,
            Backend::Memory(mem) => Ok(mem.get_session(id)),
        }
    }

    /// Active sessions, newest first, capped at `limit`.
    pub async fn list_active_sessions(&self, limit: u32) -> Result<Vec<Session>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.list_active_sessions(limit).await,
            Backend::Memory(mem) => Ok(mem.list_active_sessions(limit)),
        }
    }

    /// Completed sessions where the user is host or participant,
    /// newest first, capped at `limit`.
    pub async fn list_completed_for_user(
        &self,
        external_id: &str,
        limit: u32,
    ) -> Result<Vec<Session>, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.list_completed_for_user(external_id, limit).await,
            Backend::Memory(mem) => Ok(mem.list_completed_for_user(external_id, limit)),
        }
    }

    /// Atomically assign the participant slot.
    ///
    /// The check-then-set is a single conditional update: it fails with
    /// `Conflict` if a participant is already assigned and `InvalidState`
    /// if the session is no longer active, so two concurrent joiners can
    /// never both succeed.
    pub async fn assign_participant(
        &self,
        session_id: &str,
        external_id: &str,
    ) -> Result<Session, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.assign_participant(session_id, external_id).await,
            Backend::Memory(mem) => mem.assign_participant(session_id, external_id),
        }
    }

    /// Clear the participant slot, but only if it still holds the given
    /// user. Compensation path for a provider failure after assignment.
    pub async fn unassign_participant(
        &self,
        session_id: &str,
        external_id: &str,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.unassign_participant(session_id, external_id).await,
            Backend::Memory(mem) => {
                mem.unassign_participant(session_id, external_id);
                Ok(())
            }
        }
    }

    /// Atomically transition `active -> completed`.
    ///
    /// Fails with `InvalidState` if the session is already completed,
    /// which also settles a double-end race in favor of the first caller.
    pub async fn complete_session(&self, session_id: &str) -> Result<Session, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.complete_session(session_id).await,
            Backend::Memory(mem) => mem.complete_session(session_id),
        }
    }
}
