use std::path::PathBuf;

/// Errors from the protocol counter.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    /// The backing store rejected the write.
    #[error("failed to persist sequence state: {0}")]
    PersistFailed(String),

    /// I/O error from the file backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted state exists but cannot be decoded.
    #[error("corrupt sequence state at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The counter reached `u64::MAX` for the current year.
    #[error("protocol counter overflow for year {0}")]
    Overflow(i32),
}

/// Result alias for sequence operations.
pub type SequenceResult<T> = Result<T, SequenceError>;
