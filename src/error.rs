use std::fmt::Display;

use thiserror::Error;

/// Standardized error type for repository operations
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Malformed query: {0}")]
    MalformedQuery(String),
    #[error("Expected at most one {entity} row, found {found}")]
    UniquenessViolation { entity: &'static str, found: usize },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RepoError {
    /// Create a new not found error
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new malformed query error
    pub fn malformed_query(message: impl Into<String>) -> Self {
        Self::MalformedQuery(message.into())
    }

    /// Create a new uniqueness violation error
    pub fn uniqueness_violation(entity: &'static str, found: usize) -> Self {
        Self::UniquenessViolation { entity, found }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check whether this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T, E = RepoError> = core::result::Result<T, E>;
