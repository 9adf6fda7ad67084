// SPDX-License-Identifier: MIT

//! Session model and API view types.

use crate::models::UserSummary;
use serde::{Deserialize, Serialize};

/// Session lifecycle status. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// Mock-interview session stored in the `sessions` collection.
///
/// Host and participant are references to users by external identity id.
/// `call_id` correlates the session 1:1 with the provider's video call
/// and chat channel and never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub problem: String,
    pub difficulty: String,
    pub host_id: String,
    pub participant_id: Option<String>,
    pub call_id: String,
    pub status: SessionStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn involves(&self, external_id: &str) -> bool {
        self.host_id == external_id || self.participant_id.as_deref() == Some(external_id)
    }
}

/// API view of a session with user references resolved to display fields.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub problem: String,
    pub difficulty: String,
    pub host: UserSummary,
    pub participant: Option<UserSummary>,
    pub call_id: String,
    pub status: SessionStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl SessionView {
    pub fn new(session: Session, host: UserSummary, participant: Option<UserSummary>) -> Self {
        Self {
            id: session.id,
            problem: session.problem,
            difficulty: session.difficulty,
            host,
            participant,
            call_id: session.call_id,
            status: session.status,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
