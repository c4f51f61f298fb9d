use std::fmt;
use std::path::PathBuf;

use ordina_types::{DocumentFormat, ProtocolNumber};

/// A stamped document as written to disk.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// BLAKE3 digest of the written bytes, lower-case hex.
    pub fn digest(&self) -> String {
        hex::encode(blake3::hash(&self.bytes).as_bytes())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("source_path", &self.source_path)
            .field("output_path", &self.output_path)
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Result of a successful [`stamp`](crate::ProtocolEngine::stamp).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StampOutcome {
    pub protocol: ProtocolNumber,
    pub artifact: Artifact,
}

/// Steps of one stamping operation, in order. `Failed` is reachable from any
/// step after `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StampPhase {
    Idle,
    NumberAllocated,
    Rendered,
    Stamped,
    Recorded,
    Done,
    Failed,
}

impl StampPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::NumberAllocated => "number-allocated",
            Self::Rendered => "rendered",
            Self::Stamped => "stamped",
            Self::Recorded => "recorded",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StampPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
