pub mod repository;

pub use repository::{DepartureRepository, PackageRepository};

/// Failure reported by a backend collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Backend responded {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
