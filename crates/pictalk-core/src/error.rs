/// Errors from tree store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness or foreign-key constraint rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The backend could not be reached (lock poisoned, bucket missing, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced to callers of the picto manager.
///
/// `Internal` deliberately carries no detail; the cause is logged where it happens.
#[derive(Debug, thiserror::Error)]
pub enum PictoError {
    #[error("picto not found")]
    NotFound,

    #[error("invalid picto tree: {0}")]
    InvalidTree(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("internal error")]
    Internal,
}
