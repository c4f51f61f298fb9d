//! Protocol counter for Ordina.
//!
//! [`SequenceStore`] hands out `(year, number)` pairs. Numbers within a year
//! are strictly increasing, never reused, and survive restarts through a
//! pluggable [`SequenceBackend`].
//!
//! # Design Rules
//!
//! 1. `next()` is serialized by one mutex per store; no two callers observe
//!    the same pair.
//! 2. The wall-clock year at call time wins: a stored year that differs
//!    restarts the counter at zero inside the same critical section.
//! 3. State is persisted before `next()` returns. A failed write leaves the
//!    in-memory counter at its pre-call value.
//! 4. There is no inter-process lock. Two processes sharing one state file can
//!    allocate duplicates.

pub mod backend;
pub mod error;
pub mod file;
pub mod state;
pub mod store;

pub use backend::{InMemorySequenceBackend, SequenceBackend};
pub use error::{SequenceError, SequenceResult};
pub use file::FileSequenceBackend;
pub use state::SequenceState;
pub use store::SequenceStore;
