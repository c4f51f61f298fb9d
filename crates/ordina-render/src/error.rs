/// Errors from stamp configuration and seal handling.
///
/// Rendering itself cannot fail; every error here surfaces while the renderer
/// or seal is being prepared.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid stamp style: {0}")]
    InvalidStyle(String),

    #[error("seal image cannot be decoded: {0}")]
    SealDecode(String),

    #[error("seal image cannot be encoded: {0}")]
    SealEncode(String),
}

/// Result alias for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
