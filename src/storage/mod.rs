//! Prediction history persistence and dashboard analytics
//!
//! SQLite through rusqlite. A [`Storage`] owns the connection; the record
//! store and analytics borrow it.

use thiserror::Error;

/// Dashboard aggregates over stored predictions.
pub mod analytics;
/// Per-user prediction records.
pub mod history;
/// Database schema and connection management.
pub mod schema;

pub use analytics::{Analytics, DailyCount, DashboardStats, LabelCount, RiskCount, UserActivity};
pub use history::{PredictionRecord, PredictionStore, MAX_HISTORY_LIMIT, MAX_PAGE_SIZE};
pub use schema::{Storage, StorageConfig};

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite failure
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored JSON column could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// History limit outside 1..=MAX_HISTORY_LIMIT
    #[error("limit must be between 1 and {max}, got {limit}")]
    InvalidLimit {
        /// Requested limit
        limit: usize,
        /// Largest accepted limit
        max: usize,
    },

    /// Page numbers start at 1
    #[error("page must be at least 1, got {page}")]
    InvalidPage {
        /// Requested page
        page: usize,
    },

    /// Page size outside 1..=MAX_PAGE_SIZE
    #[error("per_page must be between 1 and {max}, got {per_page}")]
    InvalidPageSize {
        /// Requested page size
        per_page: usize,
        /// Largest accepted page size
        max: usize,
    },

    /// A stored row no longer matches the current types
    #[error("corrupt record {id}: {message}")]
    Corrupt {
        /// Row id
        id: i64,
        /// What failed to decode
        message: String,
    },
}
