use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::tier_lists::TierListError, infra::error::InfraError};

/// Error chain flattened for logging, outermost message first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    TierList(#[from] TierListError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the command line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::TierList(TierListError::NotFound(_)) => 2,
            AppError::TierList(TierListError::Forbidden(_)) => 3,
            AppError::TierList(
                TierListError::InvalidCursor(_) | TierListError::Payload(_),
            )
            | AppError::Validation(_) => 4,
            AppError::Infra(InfraError::Configuration { .. }) => 78,
            AppError::TierList(TierListError::Repo(_))
            | AppError::Infra(_)
            | AppError::Unexpected(_) => 1,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
