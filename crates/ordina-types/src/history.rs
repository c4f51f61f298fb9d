use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::protocol::ProtocolNumber;

/// `DD/MM/YYYY`, the date column of the ledger.
pub const DATE_FORMAT: &str = "%d/%m/%Y";
/// `HH:MM:SS`, the time column of the ledger.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// One row of the audit ledger: a completed stamping operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Rendered protocol number.
    pub protocol_number: String,
    /// `DD/MM/YYYY`.
    pub date: String,
    /// `HH:MM:SS`.
    pub time: String,
    /// Where the stamped artifact was written.
    pub output_path: String,
    /// Partition key.
    pub year: i32,
}

impl HistoryEntry {
    /// Build an entry for `protocol`, stamped at `at` and written to `output_path`.
    ///
    /// The partition is the protocol's sequence year, not the calendar year of
    /// `at`, so an entry always lands next to the numbers it shares a counter with.
    pub fn new(protocol: &ProtocolNumber, at: NaiveDateTime, output_path: impl Into<String>) -> Self {
        Self {
            protocol_number: protocol.formatted.clone(),
            date: at.format(DATE_FORMAT).to_string(),
            time: at.format(TIME_FORMAT).to_string(),
            output_path: output_path.into(),
            year: protocol.year,
        }
    }

    /// Case-insensitive substring match over every visible column.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            &self.protocol_number,
            &self.date,
            &self.time,
            &self.output_path,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Administrative actions that change the numbering or the ledger itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminAction {
    /// The counter for `year` was reset to zero; `previous` is the state it replaced.
    SequenceReset {
        year: i32,
        previous_year: i32,
        previous_last_number: u64,
    },
    /// Every history entry of `year` was dropped.
    HistoryDeleted { year: i32, existed: bool },
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceReset {
                year,
                previous_year,
                previous_last_number,
            } => write!(
                f,
                "sequence reset for {year} (was {previous_last_number} in {previous_year})"
            ),
            Self::HistoryDeleted { year, existed } => {
                write!(f, "history deleted for {year} (existed: {existed})")
            }
        }
    }
}

/// A journaled administrative action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub action: AdminAction,
    pub date: String,
    pub time: String,
    pub year: i32,
}

impl AdminRecord {
    pub fn new(action: AdminAction, at: NaiveDateTime) -> Self {
        Self {
            action,
            date: at.format(DATE_FORMAT).to_string(),
            time: at.format(TIME_FORMAT).to_string(),
            year: at.year(),
        }
    }
}
