use thiserror::Error;

use crate::{
    application::render::{RenderConfigError, RenderError},
    config::LoadError,
    infra::error::InfraError,
};

/// Aggregate error for the command-line entry point.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    RenderConfig(#[from] RenderConfigError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl AppError {
    /// Process exit code: 2 for configuration problems, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::RenderConfig(_) => 2,
            AppError::Render(_) | AppError::Infra(_) => 1,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::Infra(InfraError::from(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_exit_with_two() {
        let error = AppError::from(LoadError::invalid("render.toc_min_level", "out of range"));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn render_errors_keep_their_message() {
        let error = AppError::from(RenderError::InputTooLarge { size: 10, limit: 4 });
        assert_eq!(error.exit_code(), 1);
        assert_eq!(
            error.to_string(),
            "input is 10 bytes, exceeding the 4 byte limit"
        );
    }
}
