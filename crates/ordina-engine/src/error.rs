use std::path::PathBuf;

use ordina_ledger::LedgerError;
use ordina_sequence::SequenceError;
use ordina_stamp::StampError;
use ordina_types::ProtocolNumber;
use thiserror::Error;

/// Everything [`ProtocolEngine`](crate::ProtocolEngine) can report.
///
/// The first four kinds are raised before a number is allocated and leave no
/// trace. The kinds that carry a [`ProtocolNumber`] happened after allocation:
/// that number is retired and will not be handed out again.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("source document not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("source document {} cannot be read: {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("unsupported document format {extension:?} for {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("protocol {protocol} retired, document cannot be stamped: {source}")]
    MalformedDocument {
        protocol: ProtocolNumber,
        #[source]
        source: StampError,
    },

    #[error("protocol sequence storage failed: {0}")]
    SequencePersistFailure(#[from] SequenceError),

    #[error("protocol {protocol} retired, cannot write {}: {reason}", path.display())]
    OutputWriteFailure {
        protocol: ProtocolNumber,
        path: PathBuf,
        reason: String,
    },

    #[error("protocol {protocol} written to {} but not recorded: {source}", path.display())]
    LedgerWriteFailure {
        protocol: ProtocolNumber,
        path: PathBuf,
        #[source]
        source: LedgerError,
    },

    #[error("history cannot be read: {0}")]
    LedgerReadFailure(#[source] LedgerError),

    #[error("administrative history write failed: {0}")]
    AdminWriteFailure(#[source] LedgerError),
}

impl EngineError {
    /// The number consumed by a failed stamping, if allocation had happened.
    pub fn burned_number(&self) -> Option<&ProtocolNumber> {
        match self {
            Self::MalformedDocument { protocol, .. }
            | Self::OutputWriteFailure { protocol, .. }
            | Self::LedgerWriteFailure { protocol, .. } => Some(protocol),
            _ => None,
        }
    }

    /// Whether the failure happened before any state changed.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::SourceUnreadable { .. }
                | Self::UnsupportedFormat { .. }
                | Self::InvalidConfig(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ordina_types::{DocumentFormat, ProtocolFormat};

    #[test]
    fn burned_number_only_after_allocation() {
        let protocol = ProtocolFormat::default().render(2025, 7);
        let malformed = EngineError::MalformedDocument {
            protocol: protocol.clone(),
            source: StampError::malformed(DocumentFormat::Pdf, "no pages"),
        };
        assert_eq!(malformed.burned_number(), Some(&protocol));
        assert!(!malformed.is_preflight());

        let missing = EngineError::SourceNotFound(PathBuf::from("gone.pdf"));
        assert_eq!(missing.burned_number(), None);
        assert!(missing.is_preflight());
    }

    #[test]
    fn messages_name_the_protocol() {
        let protocol = ProtocolFormat::default().render(2025, 9);
        let err = EngineError::OutputWriteFailure {
            protocol,
            path: PathBuf::from("out/2025/a__9.png"),
            reason: "disk full".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("9/2025"));
        assert!(msg.contains("disk full"));
    }
}
