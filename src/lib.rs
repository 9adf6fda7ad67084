// SPDX-License-Identifier: MIT

//! CodePair: pair up for live mock coding interviews
//!
//! This crate provides the backend API for hosting and joining mock
//! interview sessions, backed by a document store and the Stream
//! video/chat provider.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Database;
use services::{SessionService, StreamService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub stream: StreamService,
    pub sessions: SessionService,
}
