use std::path::PathBuf;

use crate::llm::ProviderError;

/// Pipeline-wide error type. Each variant maps to one failure class of the
/// load -> tailor -> merge -> render pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("failed to parse LLM output: {0}")]
    Parse(String),

    #[error("resume merge failed: {0}")]
    Merge(String),

    #[error("renderer failed: {0}")]
    Render(String),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
