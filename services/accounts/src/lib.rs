//! Accounts service
//!
//! User registration, login and session introspection over HTTP. Users and
//! their profiles live in PostgreSQL; callers authenticate with stateless
//! JWT bearer tokens.
//!
//! ```text
//! routes ── middleware ──┐
//!    │                   │
//! service ── jwt, password, validation
//!    │
//! repositories (PostgreSQL | in-memory)
//! ```

pub mod config;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;

use sqlx::migrate::Migrator;

/// Schema migrations of the accounts service
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub use routes::create_router;
pub use state::AppState;
