use coinwatch_core::{CoreError, Fault, ServiceError, ValidationError};
use coinwatch_store::StoreError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("local store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}; run `coinwatch reset` to clear local state")]
    Fault(#[from] Fault),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Core(CoreError::Validation(_)) => 2,
            Self::Service(_) => 3,
            Self::Serialization(_) => 4,
            Self::Core(CoreError::Serialization(_)) => 4,
            Self::Fault(_) => 5,
            Self::Store(_) => 6,
            Self::Core(CoreError::Store(_)) => 6,
            Self::Io(_) => 10,
        }
    }
}
