// SPDX-License-Identifier: MIT

//! Firestore store backend with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, keyed by external identity id)
//! - Sessions (mock-interview sessions, keyed by generated id)
//!
//! Conditional session updates (participant assignment, completion) run
//! inside Firestore transactions so concurrent writers cannot both win.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Session, SessionStatus, User};

#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Connect to Firestore.
    ///
    /// For local development with the emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn connect(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::connect_emulator(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Connect to the Firestore emulator with unauthenticated access,
    /// avoiding local credential warnings and leakage.
    async fn connect_emulator(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn find_user(&self, external_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(external_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a user unless one exists. The document id is the external
    /// identity id, so a concurrent duplicate write collapses to a
    /// single record either way.
    pub async fn create_user_if_absent(&self, user: User) -> Result<(User, bool), AppError> {
        if let Some(existing) = self.find_user(&user.external_id).await? {
            return Ok((existing, false));
        }

        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.external_id)
            .object(&user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((user, true))
    }

    pub async fn delete_user(&self, external_id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(external_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Session Operations ──────────────────────────────────────

    /// Clone the client bound to the transaction's id so reads go
    /// through the transaction and register in its read set. A plain
    /// read would leave the commit with nothing to conflict-check.
    fn transactional_reader(
        &self,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        self.client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        )
    }

    pub async fn create_session(&self, session: &Session) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(&session.id)
            .object(session)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_active_sessions(&self, limit: u32) -> Result<Vec<Session>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::SESSIONS)
            .filter(|q| q.field("status").eq("active"))
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_completed_for_user(
        &self,
        external_id: &str,
        limit: u32,
    ) -> Result<Vec<Session>, AppError> {
        let external_id = external_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::SESSIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("status").eq("completed"),
                    q.for_any([
                        q.field("host_id").eq(external_id.clone()),
                        q.field("participant_id").eq(external_id.clone()),
                    ]),
                ])
            })
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Assign the participant slot inside a transaction.
    ///
    /// The transactional read registers the document for conflict
    /// detection; if a concurrent join commits first, this commit
    /// fails and the loser never observes a half-applied state.
    pub async fn assign_participant(
        &self,
        session_id: &str,
        external_id: &str,
    ) -> Result<Session, AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<Session> = self
            .transactional_reader(&transaction)
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(session_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(mut session) = current else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        };

        if session.status != SessionStatus::Active {
            let _ = transaction.rollback().await;
            return Err(AppError::InvalidState(
                "Cannot join a completed session".to_string(),
            ));
        }
        if session.participant_id.is_some() {
            let _ = transaction.rollback().await;
            return Err(AppError::Conflict("Session is full".to_string()));
        }

        session.participant_id = Some(external_id.to_string());
        session.updated_at = chrono::Utc::now().to_rfc3339();

        self.client
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(&session.id)
            .object(&session)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add session to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Conflict(format!("Join lost a concurrent update: {}", e)))?;

        Ok(session)
    }

    /// Clear the participant slot if it still holds the given user.
    pub async fn unassign_participant(
        &self,
        session_id: &str,
        external_id: &str,
    ) -> Result<(), AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<Session> = self
            .transactional_reader(&transaction)
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(session_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(mut session) = current else {
            let _ = transaction.rollback().await;
            return Ok(());
        };

        if session.participant_id.as_deref() != Some(external_id) {
            let _ = transaction.rollback().await;
            return Ok(());
        }

        session.participant_id = None;
        session.updated_at = chrono::Utc::now().to_rfc3339();

        self.client
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(&session.id)
            .object(&session)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add session to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Unassign commit failed: {}", e)))?;

        Ok(())
    }

    /// Transition `active -> completed` inside a transaction.
    pub async fn complete_session(&self, session_id: &str) -> Result<Session, AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<Session> = self
            .transactional_reader(&transaction)
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(session_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(mut session) = current else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        };

        if session.status != SessionStatus::Active {
            let _ = transaction.rollback().await;
            return Err(AppError::InvalidState(
                "Session is already completed".to_string(),
            ));
        }

        session.status = SessionStatus::Completed;
        session.updated_at = chrono::Utc::now().to_rfc3339();

        self.client
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(&session.id)
            .object(&session)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add session to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Complete commit failed: {}", e)))?;

        Ok(session)
    }
}
