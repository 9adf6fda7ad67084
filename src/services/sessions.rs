// SPDX-License-Identifier: MIT

//! Session lifecycle service.
//!
//! The only writer of session records. Enforces the lifecycle
//! invariants (one host, at most one participant, host never joins
//! their own session, `active -> completed` is terminal) and keeps the
//! provider's call/channel resources consistent with session status.
//!
//! Partial-failure policy: no persisted-state change unless the
//! provider side effects succeed. Creation runs provider-first with a
//! compensating delete if persistence fails; join rolls its assignment
//! back if the channel membership update fails; end only flips the
//! status after both provider deletions succeed.

use crate::db::{new_document_id, Database, LIST_LIMIT};
use crate::error::AppError;
use crate::models::{Session, SessionStatus, SessionView, User, UserSummary};
use crate::services::StreamService;
use futures_util::{stream, StreamExt};
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::HashMap;

const MAX_CONCURRENT_USER_LOOKUPS: usize = 8;

#[derive(Clone)]
pub struct SessionService {
    db: Database,
    stream: StreamService,
}

impl SessionService {
    pub fn new(db: Database, stream: StreamService) -> Self {
        Self { db, stream }
    }

    /// Create a session hosted by `caller`.
    ///
    /// Provider resources are created before the session is persisted,
    /// so a provider failure leaves no orphaned record. If persistence
    /// fails afterwards, the call and channel are deleted best-effort.
    pub async fn create(
        &self,
        caller: &User,
        problem: &str,
        difficulty: &str,
    ) -> Result<SessionView, AppError> {
        let problem = problem.trim();
        let difficulty = difficulty.trim();
        if problem.is_empty() || difficulty.is_empty() {
            return Err(AppError::BadRequest(
                "Problem and difficulty are required".to_string(),
            ));
        }

        let session_id = new_document_id()?;
        let call_id = generate_call_id()?;
        let now = chrono::Utc::now().to_rfc3339();

        self.stream
            .create_call(&call_id, &caller.external_id, &session_id, problem, difficulty)
            .await?;
        self.stream
            .create_channel(
                &call_id,
                &caller.external_id,
                &format!("{} Session", problem),
            )
            .await?;

        let session = Session {
            id: session_id,
            problem: problem.to_string(),
            difficulty: difficulty.to_string(),
            host_id: caller.external_id.clone(),
            participant_id: None,
            call_id: call_id.clone(),
            status: SessionStatus::Active,
            created_at: now.clone(),
            updated_at: now,
        };

        if let Err(e) = self.db.create_session(&session).await {
            tracing::error!(
                call_id = %call_id,
                error = %e,
                "Session persistence failed after provider setup, compensating"
            );
            if let Err(cleanup) = self.stream.delete_call(&call_id).await {
                tracing::warn!(call_id = %call_id, error = %cleanup, "Compensating call deletion failed");
            }
            if let Err(cleanup) = self.stream.delete_channel(&call_id).await {
                tracing::warn!(call_id = %call_id, error = %cleanup, "Compensating channel deletion failed");
            }
            return Err(e);
        }

        tracing::info!(
            session_id = %session.id,
            call_id = %session.call_id,
            host = %session.host_id,
            "Session created"
        );

        Ok(SessionView::new(
            session,
            UserSummary::from(caller.clone()),
            None,
        ))
    }

    /// Active sessions, newest first, capped, with users resolved.
    pub async fn list_active(&self) -> Result<Vec<SessionView>, AppError> {
        let sessions = self.db.list_active_sessions(LIST_LIMIT).await?;
        self.resolve_views(sessions).await
    }

    /// Caller's completed sessions (as host or participant).
    pub async fn list_mine(&self, caller: &User) -> Result<Vec<SessionView>, AppError> {
        let sessions = self
            .db
            .list_completed_for_user(&caller.external_id, LIST_LIMIT)
            .await?;
        self.resolve_views(sessions).await
    }

    /// Fetch a single session by id.
    pub async fn get(&self, id: &str) -> Result<SessionView, AppError> {
        let session = self
            .db
            .get_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        self.resolve_view(session).await
    }

    /// Join a session as participant.
    ///
    /// The participant slot is taken with an atomic conditional update;
    /// of two concurrent joiners exactly one succeeds and the other gets
    /// `Conflict`. Video-call join happens client-side; this only adds
    /// the joiner to the chat channel.
    pub async fn join(&self, caller: &User, id: &str) -> Result<SessionView, AppError> {
        let session = self
            .db
            .get_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;

        if !session.is_active() {
            return Err(AppError::InvalidState(
                "Cannot join a completed session".to_string(),
            ));
        }
        if session.host_id == caller.external_id {
            return Err(AppError::Forbidden(
                "Host cannot join their own session as participant".to_string(),
            ));
        }
        if session.participant_id.is_some() {
            return Err(AppError::Conflict("Session is full".to_string()));
        }

        // Authoritative check-then-set; the reads above are a fast path.
        let session = self.db.assign_participant(id, &caller.external_id).await?;

        if let Err(e) = self
            .stream
            .add_channel_member(&session.call_id, &caller.external_id)
            .await
        {
            tracing::error!(
                session_id = %session.id,
                error = %e,
                "Channel membership update failed, rolling back participant"
            );
            if let Err(rollback) = self.db.unassign_participant(id, &caller.external_id).await {
                tracing::warn!(session_id = %session.id, error = %rollback, "Participant rollback failed");
            }
            return Err(e);
        }

        tracing::info!(
            session_id = %session.id,
            participant = %caller.external_id,
            "Participant joined session"
        );

        self.resolve_view(session).await
    }

    /// End a session. Host only.
    ///
    /// Provider resources are deleted first; the status transition only
    /// happens once both deletions succeed, so a provider failure never
    /// leaves a completed session with live call/channel resources.
    pub async fn end(&self, caller: &User, id: &str) -> Result<SessionView, AppError> {
        let session = self
            .db
            .get_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;

        if session.host_id != caller.external_id {
            return Err(AppError::Forbidden(
                "Only the host can end the session".to_string(),
            ));
        }
        if !session.is_active() {
            return Err(AppError::InvalidState(
                "Session is already completed".to_string(),
            ));
        }

        self.stream.delete_call(&session.call_id).await?;
        self.stream.delete_channel(&session.call_id).await?;

        let session = self.db.complete_session(id).await?;

        tracing::info!(
            session_id = %session.id,
            host = %session.host_id,
            "Session ended"
        );

        self.resolve_view(session).await
    }

    // ─── Reference Resolution ────────────────────────────────────

    async fn resolve_view(&self, session: Session) -> Result<SessionView, AppError> {
        let views = self.resolve_views(vec![session]).await?;
        views
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Resolved view vanished")))
    }

    /// Resolve host/participant references to display fields with a
    /// bounded number of concurrent lookups.
    async fn resolve_views(&self, sessions: Vec<Session>) -> Result<Vec<SessionView>, AppError> {
        let mut ids: Vec<String> = sessions
            .iter()
            .flat_map(|s| {
                std::iter::once(s.host_id.clone()).chain(s.participant_id.clone())
            })
            .collect();
        ids.sort();
        ids.dedup();

        let db = self.db.clone();
        let users: HashMap<String, User> = stream::iter(ids)
            .map(|id| {
                let db = db.clone();
                async move { db.find_user(&id).await.map(|user| (id, user)) }
            })
            .buffer_unordered(MAX_CONCURRENT_USER_LOOKUPS)
            .collect::<Vec<Result<(String, Option<User>), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<(String, Option<User>)>, AppError>>()?
            .into_iter()
            .filter_map(|(id, user)| user.map(|u| (id, u)))
            .collect();

        let summary = |id: &str| -> UserSummary {
            users
                .get(id)
                .cloned()
                .map(UserSummary::from)
                .unwrap_or_else(|| UserSummary::placeholder(id))
        };

        Ok(sessions
            .into_iter()
            .map(|session| {
                let host = summary(&session.host_id);
                let participant = session.participant_id.as_deref().map(|pid| summary(pid));
                SessionView::new(session, host, participant)
            })
            .collect())
    }
}

/// Generate a call identifier: timestamp plus random suffix. Uniqueness
/// is best-effort, matching the provider's opaque key expectations.
fn generate_call_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 4];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
    Ok(format!(
        "session_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        hex::encode(bytes)
    ))
}
