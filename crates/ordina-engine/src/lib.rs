//! Ordina protocol stamping engine.
//!
//! [`ProtocolEngine`] ties the other crates together: it allocates a number
//! from the [`SequenceStore`](ordina_sequence::SequenceStore), renders the
//! stamp, hands it to the stamper for the document's format, writes the
//! artifact under `<output_root>/<year>/` and records it in the history
//! ledger.
//!
//! # Key Types
//!
//! - [`ProtocolEngine`]: the orchestrator and public API
//! - [`EngineConfig`]: TOML-backed settings, snapshotted per call
//! - [`StampOutcome`] / [`Artifact`]: what a successful stamp returns
//! - [`OutputPathResolver`]: artifact naming
//! - [`EngineError`]: every failure, with the burned number when there is one
//!
//! # Design Rules
//!
//! 1. Everything that can be checked without side effects is checked before
//!    a number is allocated.
//! 2. A number is allocated before the document is stamped. If stamping,
//!    writing or recording fails afterwards the number is retired, never
//!    reused: gaps are allowed, duplicates are not.
//! 3. Artifacts are written to a temp file and linked into place; an existing
//!    file is never overwritten.
//! 4. The history entry is appended only after the artifact is durable. A
//!    crash in between leaves an unrecorded artifact.
//! 5. No inter-process locking: one state directory per running process.

pub mod config;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod paths;

pub use config::{EngineConfig, StampStyleConfig};
pub use engine::ProtocolEngine;
pub use error::{EngineError, EngineResult};
pub use outcome::{Artifact, StampOutcome, StampPhase};
pub use paths::OutputPathResolver;
