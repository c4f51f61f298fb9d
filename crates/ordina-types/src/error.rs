use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid protocol format {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid color {0:?}: expected #RRGGBB")]
    InvalidColor(String),

    #[error("unknown stamp position {0:?}")]
    InvalidPosition(String),
}
