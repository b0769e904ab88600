use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::repos::RepoError, config::LoadError, infra::error::InfraError,
    presentation::views::TemplateRenderError,
};

/// Source and cause chain of a failure, for logging.
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

    pub fn from_message(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            source,
            messages: vec![message.into()],
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error("{source} failed during `{operation}`: {error}")]
    Repo {
        source: &'static str,
        operation: &'static str,
        #[source]
        error: RepoError,
    },
    #[error(transparent)]
    Render(#[from] TemplateRenderError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn repo(source: &'static str, operation: &'static str, error: RepoError) -> Self {
        Self::Repo {
            source,
            operation,
            error,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn report(&self) -> ErrorReport {
        let source = match self {
            AppError::Repo { source, .. } => *source,
            AppError::Render(err) => err.origin(),
            AppError::Infra(_) => "infra",
            AppError::Config(_) => "config",
            AppError::Validation(_) | AppError::Unexpected(_) => "application",
        };
        ErrorReport::from_error(source, self)
    }

    /// Process exit status for the operator binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Validation(_) | AppError::Config(_) => 2,
            AppError::Infra(err) if err.is_storage() => 3,
            AppError::Repo { .. } => 3,
            _ => 1,
        }
    }
}
