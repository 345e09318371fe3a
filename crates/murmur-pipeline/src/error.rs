use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("storage error: {0}")]
    Storage(#[from] murmur_threads::StorageError),

    /// An extension raised during a pipeline stage. Not recovered here —
    /// extensions own their own error handling, so this fails the turn.
    #[error(transparent)]
    Extension(#[from] murmur_core::MurmurError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
