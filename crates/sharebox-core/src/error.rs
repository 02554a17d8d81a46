//! Unified application error types for Sharebox.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

use sharebox_entity::share::quota::QuotaViolation;

/// Top-level error kind categorization used across the entire application.
///
/// Storage sentinel kinds are matched by callers (the HTTP layer maps them
/// to status codes), so the kind travels as data on one error type rather
/// than as distinct error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The share name contains characters outside the safe set.
    InvalidShareName,
    /// The requested share does not exist.
    ShareNotFound,
    /// A share with this name already exists.
    ShareAlreadyExists,
    /// The share has reached its configured size limit.
    MaxShareSizeReached,
    /// The item exceeds the configured per-item size limit.
    MaxFileSizeReached,
    /// The item name is empty or reserved.
    InvalidItemName,
    /// The requested item does not exist.
    ItemNotFound,
    /// The upload produced no bytes.
    EmptyItem,
    /// Input validation failed.
    Validation,
    /// A storage I/O error occurred.
    Storage,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidShareName => write!(f, "INVALID_SHARE_NAME"),
            Self::ShareNotFound => write!(f, "SHARE_NOT_FOUND"),
            Self::ShareAlreadyExists => write!(f, "SHARE_ALREADY_EXISTS"),
            Self::MaxShareSizeReached => write!(f, "MAX_SHARE_SIZE_REACHED"),
            Self::MaxFileSizeReached => write!(f, "MAX_FILE_SIZE_REACHED"),
            Self::InvalidItemName => write!(f, "INVALID_ITEM_NAME"),
            Self::ItemNotFound => write!(f, "ITEM_NOT_FOUND"),
            Self::EmptyItem => write!(f, "EMPTY_ITEM"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout Sharebox.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-share-name error.
    pub fn invalid_share_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidShareName, message)
    }

    /// Create a share-not-found error.
    pub fn share_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ShareNotFound, message)
    }

    /// Create a share-already-exists error.
    pub fn share_already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ShareAlreadyExists, message)
    }

    /// Create an invalid-item-name error.
    pub fn invalid_item_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidItemName, message)
    }

    /// Create an item-not-found error.
    pub fn item_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ItemNotFound, message)
    }

    /// Create an empty-item error.
    pub fn empty_item(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyItem, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<QuotaViolation> for AppError {
    fn from(violation: QuotaViolation) -> Self {
        match violation {
            QuotaViolation::ShareFull => {
                Self::new(ErrorKind::MaxShareSizeReached, "Max share size reached")
            }
            QuotaViolation::ItemTooLarge => {
                Self::new(ErrorKind::MaxFileSizeReached, "Max file size reached")
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
