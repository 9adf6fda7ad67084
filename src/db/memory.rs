// SPDX-License-Identifier: MIT

//! In-memory store backend.
//!
//! Serves two roles: the degraded mode when no database is configured,
//! and the test double for integration tests. Same operations as the
//! Firestore backend; conditional updates rely on `DashMap` per-entry
//! locking, so the join check-then-set is atomic.

use crate::error::AppError;
use crate::models::{Session, SessionStatus, User};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct MemoryStore {
    users: Arc<DashMap<String, User>>,
    sessions: Arc<DashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            sessions: Arc::new(DashMap::new()),
        }
    }

    // ─── Users ──────────────────────────────────────────────────

    pub fn find_user(&self, external_id: &str) -> Option<User> {
        self.users.get(external_id).map(|u| u.clone())
    }

    pub fn create_user_if_absent(&self, user: User) -> (User, bool) {
        // entry() holds the shard lock, so concurrent syncs for the
        // same external id resolve to a single record.
        match self.users.entry(user.external_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => (existing.get().clone(), false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let stored = slot.insert(user).clone();
                (stored, true)
            }
        }
    }

    pub fn delete_user(&self, external_id: &str) {
        self.users.remove(external_id);
    }

    // ─── Sessions ───────────────────────────────────────────────

    pub fn create_session(&self, session: &Session) {
        self.sessions.insert(session.id.clone(), session.clone());
    }

    pub fn get_session(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|s| s.clone())
    }

    pub fn list_active_sessions(&self, limit: u32) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Active)
            .map(|s| s.clone())
            .collect();
        sort_newest_first(&mut sessions);
        sessions.truncate(limit as usize);
        sessions
    }

    pub fn list_completed_for_user(&self, external_id: &str, limit: u32) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed && s.involves(external_id))
            .map(|s| s.clone())
            .collect();
        sort_newest_first(&mut sessions);
        sessions.truncate(limit as usize);
        sessions
    }

    pub fn assign_participant(
        &self,
        session_id: &str,
        external_id: &str,
    ) -> Result<Session, AppError> {
        // get_mut holds a write lock on the entry for the whole
        // check-then-set, making the assignment linearizable.
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;

        if entry.status != SessionStatus::Active {
            return Err(AppError::InvalidState(
                "Cannot join a completed session".to_string(),
            ));
        }
        if entry.participant_id.is_some() {
            return Err(AppError::Conflict("Session is full".to_string()));
        }

        entry.participant_id = Some(external_id.to_string());
        entry.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(entry.clone())
    }

    pub fn unassign_participant(&self, session_id: &str, external_id: &str) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            if entry.participant_id.as_deref() == Some(external_id) {
                entry.participant_id = None;
                entry.updated_at = chrono::Utc::now().to_rfc3339();
            }
        }
    }

    pub fn complete_session(&self, session_id: &str) -> Result<Session, AppError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;

        if entry.status != SessionStatus::Active {
            return Err(AppError::InvalidState(
                "Session is already completed".to_string(),
            ));
        }

        entry.status = SessionStatus::Completed;
        entry.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(entry.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort by creation time descending; RFC 3339 strings compare
/// lexicographically. Session id breaks ties for a stable order.
fn sort_newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
