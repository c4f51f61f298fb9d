use ordina_types::{AdminRecord, HistoryEntry};

use crate::error::LedgerResult;

/// Write boundary of the stamping history.
pub trait HistoryWriter: Send + Sync {
    /// Append to the partition of `entry.year`. Durable when this returns.
    fn append(&self, entry: &HistoryEntry) -> LedgerResult<()>;

    /// Drop the whole partition of `year`. Returns whether it existed.
    fn delete_year(&self, year: i32) -> LedgerResult<bool>;

    /// Append to the administrative journal.
    fn append_admin(&self, record: &AdminRecord) -> LedgerResult<()>;
}

/// Read boundary of the stamping history.
///
/// Every listing is most-recent-first by insertion order. Entries are never
/// reordered by their date columns or deduplicated.
pub trait HistoryReader: Send + Sync {
    fn entries_for_year(&self, year: i32) -> LedgerResult<Vec<HistoryEntry>>;

    /// Years with a partition, newest first.
    fn years(&self) -> LedgerResult<Vec<i32>>;

    fn admin_records(&self) -> LedgerResult<Vec<AdminRecord>>;

    /// Case-insensitive substring search over number, date, time and output
    /// path in every partition, newest year first.
    fn search(&self, needle: &str) -> LedgerResult<Vec<HistoryEntry>> {
        let mut found = Vec::new();
        for year in self.years()? {
            found.extend(
                self.entries_for_year(year)?
                    .into_iter()
                    .filter(|entry| entry.matches(needle)),
            );
        }
        Ok(found)
    }
}

/// A full ledger: both boundaries behind one object.
pub trait HistoryLedger: HistoryWriter + HistoryReader {}

impl<T: HistoryWriter + HistoryReader> HistoryLedger for T {}
