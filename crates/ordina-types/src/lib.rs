//! Foundation types for Ordina, the protocol numbering and document stamping
//! engine.
//!
//! Every other Ordina crate depends on `ordina-types`.
//!
//! # Key Types
//!
//! - [`ProtocolFormat`]: template turning `(year, number)` into a protocol string
//! - [`ProtocolNumber`]: an allocated, formatted protocol number
//! - [`DocumentFormat`]: closed set of container formats the engine can stamp
//! - [`StampPosition`]: page/image corner where the stamp is placed
//! - [`Rgb`]: stamp text color
//! - [`HistoryEntry`] / [`AdminRecord`]: rows of the audit ledger
//! - [`Clock`]: injectable wall clock ([`SystemClock`], [`FixedClock`])

pub mod clock;
pub mod color;
pub mod error;
pub mod format;
pub mod history;
pub mod protocol;

pub use clock::{Clock, FixedClock, SystemClock};
pub use color::Rgb;
pub use error::TypeError;
pub use format::{DocumentFormat, StampPosition};
pub use history::{AdminAction, AdminRecord, HistoryEntry, DATE_FORMAT, TIME_FORMAT};
pub use protocol::{ProtocolFormat, ProtocolNumber};
