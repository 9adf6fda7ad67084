// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod session;
pub mod user;

pub use session::{Session, SessionStatus, SessionView};
pub use user::{User, UserSummary};
