//! Year-partitioned, append-only stamping history for Ordina.
//!
//! Every completed stamping produces one [`HistoryEntry`](ordina_types::HistoryEntry)
//! in the partition of its protocol year. Partitions are only ever appended
//! to or dropped whole; administrative actions (sequence resets, partition
//! deletions) go to a separate journal.
//!
//! - [`HistoryWriter`] / [`HistoryReader`] trait boundaries, joined as [`HistoryLedger`]
//! - [`InMemoryHistoryLedger`] for tests and embedding
//! - [`FileHistoryLedger`]: one CRC-framed log per year, fsynced per append

pub mod error;
pub mod file;
pub mod frame;
pub mod memory;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use file::FileHistoryLedger;
pub use memory::InMemoryHistoryLedger;
pub use traits::{HistoryLedger, HistoryReader, HistoryWriter};
