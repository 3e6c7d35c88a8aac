pub mod identity;
pub mod marketplace;
pub mod notification;
pub mod repository;
pub mod request;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Boxed error type shared by the repository and marketplace traits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
