use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use ordina_types::{AdminRecord, HistoryEntry};

use crate::error::{LedgerError, LedgerResult};
use crate::traits::{HistoryReader, HistoryWriter};

/// In-memory history for tests and embedding.
#[derive(Default)]
pub struct InMemoryHistoryLedger {
    inner: RwLock<LedgerState>,
    fail_writes: AtomicBool,
}

#[derive(Default)]
struct LedgerState {
    partitions: BTreeMap<i32, Vec<HistoryEntry>>,
    admin: Vec<AdminRecord>,
}

impl InMemoryHistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`LedgerError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> LedgerResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(LedgerError::Unavailable("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

impl HistoryWriter for InMemoryHistoryLedger {
    fn append(&self, entry: &HistoryEntry) -> LedgerResult<()> {
        self.check_writable()?;
        let mut state = self.inner.write().expect("ledger lock poisoned");
        state.partitions.entry(entry.year).or_default().push(entry.clone());
        Ok(())
    }

    fn delete_year(&self, year: i32) -> LedgerResult<bool> {
        self.check_writable()?;
        let mut state = self.inner.write().expect("ledger lock poisoned");
        Ok(state.partitions.remove(&year).is_some())
    }

    fn append_admin(&self, record: &AdminRecord) -> LedgerResult<()> {
        self.check_writable()?;
        let mut state = self.inner.write().expect("ledger lock poisoned");
        state.admin.push(record.clone());
        Ok(())
    }
}

impl HistoryReader for InMemoryHistoryLedger {
    fn entries_for_year(&self, year: i32) -> LedgerResult<Vec<HistoryEntry>> {
        let state = self.inner.read().expect("ledger lock poisoned");
        Ok(state
            .partitions
            .get(&year)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn years(&self) -> LedgerResult<Vec<i32>> {
        let state = self.inner.read().expect("ledger lock poisoned");
        Ok(state.partitions.keys().rev().copied().collect())
    }

    fn admin_records(&self) -> LedgerResult<Vec<AdminRecord>> {
        let state = self.inner.read().expect("ledger lock poisoned");
        Ok(state.admin.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ordina_types::{AdminAction, ProtocolFormat};

    fn entry(year: i32, number: u64) -> HistoryEntry {
        let at = NaiveDate::from_ymd_opt(year, 2, 1)
            .unwrap()
            .and_hms_opt(10, 0, number as u32 % 60)
            .unwrap();
        HistoryEntry::new(
            &ProtocolFormat::default().render(year, number),
            at,
            format!("/out/{year}/doc__{number}.pdf"),
        )
    }

    #[test]
    fn entries_are_newest_first() {
        let ledger = InMemoryHistoryLedger::new();
        for n in 1..=3 {
            ledger.append(&entry(2025, n)).unwrap();
        }
        let numbers: Vec<String> = ledger
            .entries_for_year(2025)
            .unwrap()
            .into_iter()
            .map(|e| e.protocol_number)
            .collect();
        assert_eq!(numbers, vec!["3/2025", "2/2025", "1/2025"]);
    }

    #[test]
    fn delete_year_is_isolated() {
        let ledger = InMemoryHistoryLedger::new();
        ledger.append(&entry(2024, 1)).unwrap();
        ledger.append(&entry(2025, 1)).unwrap();
        assert!(ledger.delete_year(2024).unwrap());
        assert!(!ledger.delete_year(2024).unwrap());
        assert!(ledger.entries_for_year(2024).unwrap().is_empty());
        assert_eq!(ledger.entries_for_year(2025).unwrap().len(), 1);
        assert_eq!(ledger.years().unwrap(), vec![2025]);
    }

    #[test]
    fn search_spans_years_newest_first() {
        let ledger = InMemoryHistoryLedger::new();
        ledger.append(&entry(2023, 7)).unwrap();
        ledger.append(&entry(2025, 7)).unwrap();
        ledger.append(&entry(2025, 8)).unwrap();
        let hits: Vec<String> = ledger
            .search("DOC__7")
            .unwrap()
            .into_iter()
            .map(|e| e.protocol_number)
            .collect();
        assert_eq!(hits, vec!["7/2025", "7/2023"]);
        assert_eq!(ledger.search("01/02/2025").unwrap().len(), 2);
        assert!(ledger.search("nothing").unwrap().is_empty());
    }

    #[test]
    fn failing_writes_leave_state_untouched() {
        let ledger = InMemoryHistoryLedger::new();
        ledger.set_fail_writes(true);
        assert!(matches!(
            ledger.append(&entry(2025, 1)),
            Err(LedgerError::Unavailable(_))
        ));
        assert!(ledger.years().unwrap().is_empty());
        ledger.set_fail_writes(false);
        ledger.append(&entry(2025, 1)).unwrap();
        assert_eq!(ledger.years().unwrap(), vec![2025]);
    }

    #[test]
    fn admin_journal_is_newest_first() {
        let ledger = InMemoryHistoryLedger::new();
        let at = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        ledger
            .append_admin(&AdminRecord::new(AdminAction::HistoryDeleted { year: 2023, existed: true }, at))
            .unwrap();
        ledger
            .append_admin(&AdminRecord::new(
                AdminAction::SequenceReset {
                    year: 2025,
                    previous_year: 2025,
                    previous_last_number: 9,
                },
                at,
            ))
            .unwrap();
        let records = ledger.admin_records().unwrap();
        assert!(matches!(records[0].action, AdminAction::SequenceReset { .. }));
        assert!(matches!(records[1].action, AdminAction::HistoryDeleted { .. }));
    }
}
