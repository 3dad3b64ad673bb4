//! # DomainError
//!
//! Centralized error handling for the forum core.
//! Every variant is either a caller mistake (fix the request and retry) or a
//! storage failure. Validation and reference checks run before any write, so
//! a returned error never leaves partial state behind.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Structurally invalid input (empty content, bad thread name length, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// A parameter references something that does not exist or is not allowed.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: String, reason: String },

    /// Thread creation named a category that does not exist.
    #[error("category does not exist")]
    InvalidCategory,

    /// A category with the same normalized key already exists.
    #[error("category already exists")]
    CategoryAlreadyExists,

    #[error("thread is locked")]
    ThreadLocked,

    #[error("post has been removed")]
    PostRemoved,

    #[error("cannot like own post")]
    CannotLikeOwnPost,

    /// Lookup by primary key found nothing where the caller had no field to blame.
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Infrastructure failure (database down, pool exhausted, ...)
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_parameter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn storage(message: impl std::fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Stable identifier a request layer can put in an error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::InvalidCategory => "invalid_category",
            Self::CategoryAlreadyExists => "category_already_exists",
            Self::ThreadLocked => "thread_locked",
            Self::PostRemoved => "post_removed",
            Self::CannotLikeOwnPost => "cannot_like_own_post",
            Self::NotFound { .. } => "not_found",
            Self::Storage(_) => "storage_error",
        }
    }

    /// `true` when the request itself is at fault (maps to a 4xx).
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

/// A specialized Result type for forum logic.
pub type Result<T> = std::result::Result<T, DomainError>;
