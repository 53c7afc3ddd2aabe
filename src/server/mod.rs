//! HTTP API
//!
//! Axum router over the prediction engine and the SQLite history. The
//! classifier and the database handle are shared through [`AppState`];
//! blocking work runs on tokio's blocking pool.

/// Server configuration from TOML or environment
pub mod config;

/// API error types
pub mod error;

/// HTTP handlers for REST endpoints
pub mod handlers;

/// API response types
pub mod responses;

/// Server instance management
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use handlers::{create_router, AppState};
pub use server::ObesiTrackServer;
