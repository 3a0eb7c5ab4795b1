use thiserror::Error;

/// Errors crossing the catalog boundary. Every fallible catalog operation
/// returns one of these; nothing panics through to the HTTP layer.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("upload error: {0}")]
    Upload(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("not found")]
    NotFound,
}
