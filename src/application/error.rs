use thiserror::Error;

use crate::{
    application::render::{RenderConfigError, RenderError},
    config::LoadError,
    infra::error::InfraError,
};

/// Top-level failure of a binary command.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    RenderConfig(#[from] RenderConfigError),
    #[error("failed to render `{source_path}`: {error}")]
    Render {
        source_path: String,
        #[source]
        error: RenderError,
    },
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn render(source_path: impl Into<String>, error: RenderError) -> Self {
        Self::Render {
            source_path: source_path.into(),
            error,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code: 2 for bad input or configuration, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Validation(_) | AppError::Render { .. } => 2,
            AppError::RenderConfig(_) | AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}
