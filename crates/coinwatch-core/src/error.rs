use std::fmt::{Display, Formatter};

use coinwatch_store::StoreError;
use thiserror::Error;

/// Validation errors for user-supplied values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("coin id cannot be empty")]
    EmptyCoinId,
    #[error("coin id length {len} exceeds max {max}")]
    CoinIdTooLong { len: usize, max: usize },
    #[error("coin id contains invalid character '{ch}' at index {index}")]
    CoinIdInvalidChar { ch: char, index: usize },

    #[error("request url cannot be empty")]
    EmptyUrl,

    #[error("invalid theme '{value}', expected one of dark, light")]
    InvalidTheme { value: String },
    #[error("invalid merge policy '{value}', expected one of last-non-empty, union")]
    InvalidMergePolicy { value: String },

    #[error("email cannot be empty")]
    EmptyEmail,
    #[error("password cannot be empty")]
    EmptyPassword,
    #[error("passwords do not match")]
    PasswordMismatch,
}

/// Top-level error type for core operations that touch local state.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure classes surfaced by network and backend boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Malformed identifier or parameter; no I/O was attempted.
    InvalidInput,
    /// The local rate limiter rejected the call.
    RateLimited,
    /// Timeout, connection error, non-success status or malformed body.
    NetworkFailure,
    /// Remote store not configured or unreachable.
    BackendUnavailable,
    /// A form failed validation before any backend call.
    ValidationRejected,
}

/// Structured error returned at the fetcher and sync boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    kind: ServiceErrorKind,
    message: String,
    retryable: bool,
}

impl ServiceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::InvalidInput,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::NetworkFailure,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::BackendUnavailable,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn validation_rejected(error: ValidationError) -> Self {
        Self {
            kind: ServiceErrorKind::ValidationRejected,
            message: error.to_string(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ServiceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ServiceErrorKind::InvalidInput => "service.invalid_input",
            ServiceErrorKind::RateLimited => "service.rate_limited",
            ServiceErrorKind::NetworkFailure => "service.network_failure",
            ServiceErrorKind::BackendUnavailable => "service.backend_unavailable",
            ServiceErrorKind::ValidationRejected => "service.validation_rejected",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ServiceError {}

impl From<ValidationError> for ServiceError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_input(error.to_string())
    }
}
