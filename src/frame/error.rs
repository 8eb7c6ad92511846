use thiserror::Error;

/// Frame pipeline errors.
///
/// Both kinds describe a structural mismatch in caller-provided data, so
/// neither is retryable. A failed call leaves the pipeline state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("malformed frame: {0}")]
    Format(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;
