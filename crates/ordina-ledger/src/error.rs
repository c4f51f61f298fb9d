/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A log holds unreadable bytes at its end; appending would bury them.
    #[error("ledger log {path} is damaged from byte {offset}; refusing to append")]
    Corrupt { path: String, offset: usize },

    /// The backend refused the operation.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
