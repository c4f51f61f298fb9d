use ordina_types::DocumentFormat;

/// Errors from format dispatch and stamping.
#[derive(Debug, thiserror::Error)]
pub enum StampError {
    /// No stamper handles this file extension.
    #[error("unsupported format for {path}: extension {extension:?}")]
    UnsupportedFormat { path: String, extension: String },

    /// The raster image could not be decoded.
    #[error("malformed image: {0}")]
    MalformedImage(String),

    /// The PDF object graph could not be loaded or lacks a usable first page.
    #[error("malformed PDF: {0}")]
    MalformedPdf(String),

    /// The word-processing package is missing or breaks a part it needs.
    #[error("malformed office text document: {0}")]
    MalformedOfficeText(String),

    /// The spreadsheet package is missing or breaks a part it needs.
    #[error("malformed spreadsheet: {0}")]
    MalformedOfficeSheet(String),

    /// The stamped document could not be serialized again.
    #[error("failed to encode {format} output: {reason}")]
    Encode {
        format: DocumentFormat,
        reason: String,
    },
}

impl StampError {
    /// The `Malformed*` variant matching `format`.
    pub fn malformed(format: DocumentFormat, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match format {
            DocumentFormat::Image => Self::MalformedImage(reason),
            DocumentFormat::Pdf => Self::MalformedPdf(reason),
            DocumentFormat::OfficeText => Self::MalformedOfficeText(reason),
            DocumentFormat::OfficeSheet => Self::MalformedOfficeSheet(reason),
        }
    }

    pub fn encode(format: DocumentFormat, reason: impl ToString) -> Self {
        Self::Encode {
            format,
            reason: reason.to_string(),
        }
    }

    /// Whether the input document itself was at fault.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedImage(_)
                | Self::MalformedPdf(_)
                | Self::MalformedOfficeText(_)
                | Self::MalformedOfficeSheet(_)
        )
    }
}

/// Result alias for stamping operations.
pub type StampResult<T> = Result<T, StampError>;
