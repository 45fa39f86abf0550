use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history entry not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to replace history file: {0}")]
    Persist(#[from] tempfile::PersistError),
}
