use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ordina_types::{AdminRecord, HistoryEntry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::frame::{self, Tail};
use crate::traits::{HistoryReader, HistoryWriter};

const ADMIN_FILE: &str = "admin.log";

/// File-backed history: one framed log per year under a root directory,
/// plus `admin.log` for the administrative journal.
///
/// Appends are serialized by one mutex and fsynced before returning. The
/// first append to a log in this process cuts an interrupted append left by a
/// crash. Any other damage at the end of a log makes appends to it fail with
/// [`LedgerError::Corrupt`]; nothing already written is ever removed.
pub struct FileHistoryLedger {
    root: PathBuf,
    /// Logs already checked for a torn tail.
    repaired: Mutex<HashSet<PathBuf>>,
}

impl FileHistoryLedger {
    pub fn open(root: impl Into<PathBuf>) -> LedgerResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "history ledger opened");
        Ok(Self {
            root,
            repaired: Mutex::new(HashSet::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<year>.log`.
    pub fn partition_path(&self, year: i32) -> PathBuf {
        self.root.join(format!("{year}.log"))
    }

    fn append_frame<T: Serialize>(&self, path: &Path, record: &T) -> LedgerResult<()> {
        let frame = frame::encode(record)?;
        let mut repaired = self.repaired.lock().expect("ledger lock poisoned");
        if !repaired.contains(path) {
            repair_tail(path)?;
            repaired.insert(path.to_path_buf());
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(&frame)?;
        file.flush()?;
        file.sync_all()?;
        debug!(path = %path.display(), len = frame.len(), "ledger frame appended");
        Ok(())
    }

    /// Records of one log, newest first. A missing log is empty.
    fn read_log<T: DeserializeOwned>(&self, path: &Path) -> LedgerResult<Vec<T>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let decoded = frame::decode_all::<T>(&bytes);
        if decoded.skipped > 0 {
            warn!(path = %path.display(), skipped = decoded.skipped, "corrupt ledger frames skipped");
        }
        if let Tail::Damaged { offset } = decoded.tail {
            warn!(path = %path.display(), offset, file_len = bytes.len(), "unreadable bytes at end of ledger log");
        }
        let mut records = decoded.records;
        records.reverse();
        Ok(records)
    }
}

fn repair_tail(path: &Path) -> LedgerResult<()> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    match frame::scan(&bytes).tail {
        Tail::Clean => Ok(()),
        Tail::Torn { offset } => {
            warn!(
                path = %path.display(),
                offset,
                file_len = bytes.len(),
                "truncating torn ledger tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(offset as u64)?;
            file.sync_all()?;
            Ok(())
        }
        Tail::Damaged { offset } => Err(LedgerError::Corrupt {
            path: path.display().to_string(),
            offset,
        }),
    }
}

impl HistoryWriter for FileHistoryLedger {
    fn append(&self, entry: &HistoryEntry) -> LedgerResult<()> {
        self.append_frame(&self.partition_path(entry.year), entry)
    }

    fn delete_year(&self, year: i32) -> LedgerResult<bool> {
        let path = self.partition_path(year);
        let mut repaired = self.repaired.lock().expect("ledger lock poisoned");
        let existed = match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        repaired.remove(&path);
        info!(year, existed, "history partition deleted");
        Ok(existed)
    }

    fn append_admin(&self, record: &AdminRecord) -> LedgerResult<()> {
        self.append_frame(&self.root.join(ADMIN_FILE), record)
    }
}

impl HistoryReader for FileHistoryLedger {
    fn entries_for_year(&self, year: i32) -> LedgerResult<Vec<HistoryEntry>> {
        self.read_log(&self.partition_path(year))
    }

    fn years(&self) -> LedgerResult<Vec<i32>> {
        let mut years = Vec::new();
        for dir_entry in fs::read_dir(&self.root)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }
            let name = dir_entry.file_name();
            let year = name
                .to_str()
                .and_then(|name| name.strip_suffix(".log"))
                .and_then(|stem| stem.parse::<i32>().ok());
            if let Some(year) = year {
                years.push(year);
            }
        }
        years.sort_unstable_by(|a, b| b.cmp(a));
        Ok(years)
    }

    fn admin_records(&self) -> LedgerResult<Vec<AdminRecord>> {
        self.read_log(&self.root.join(ADMIN_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ordina_types::{AdminAction, ProtocolFormat};
    use std::io::{Read, Seek, SeekFrom};

    fn entry(year: i32, number: u64) -> HistoryEntry {
        let at = NaiveDate::from_ymd_opt(year, 4, 30)
            .unwrap()
            .and_hms_opt(17, 2, 3)
            .unwrap();
        HistoryEntry::new(
            &ProtocolFormat::default().render(year, number),
            at,
            format!("/archive/{year}/letter__{number}.docx"),
        )
    }

    #[test]
    fn append_and_read_back_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        ledger.append(&entry(2025, 1)).unwrap();
        ledger.append(&entry(2025, 2)).unwrap();
        let entries = ledger.entries_for_year(2025).unwrap();
        assert_eq!(entries, vec![entry(2025, 2), entry(2025, 1)]);
        assert!(dir.path().join("2025.log").exists());
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = FileHistoryLedger::open(dir.path()).unwrap();
            ledger.append(&entry(2024, 5)).unwrap();
        }
        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        assert_eq!(ledger.entries_for_year(2024).unwrap(), vec![entry(2024, 5)]);
    }

    #[test]
    fn partitions_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        ledger.append(&entry(2023, 1)).unwrap();
        ledger.append(&entry(2024, 1)).unwrap();
        ledger.append(&entry(2025, 1)).unwrap();
        assert_eq!(ledger.years().unwrap(), vec![2025, 2024, 2023]);

        assert!(ledger.delete_year(2024).unwrap());
        assert!(!ledger.delete_year(2024).unwrap());
        assert_eq!(ledger.years().unwrap(), vec![2025, 2023]);
        assert_eq!(ledger.entries_for_year(2023).unwrap().len(), 1);
        assert_eq!(ledger.entries_for_year(2025).unwrap().len(), 1);
        assert!(ledger.entries_for_year(2024).unwrap().is_empty());
    }

    #[test]
    fn admin_log_is_not_a_year() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 1)
            .unwrap();
        let record = AdminRecord::new(AdminAction::HistoryDeleted { year: 2020, existed: false }, at);
        ledger.append_admin(&record).unwrap();
        assert!(ledger.years().unwrap().is_empty());
        assert_eq!(ledger.admin_records().unwrap(), vec![record]);
    }

    #[test]
    fn corrupt_frame_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        ledger.append(&entry(2025, 1)).unwrap();
        ledger.append(&entry(2025, 2)).unwrap();

        let path = ledger.partition_path(2025);
        let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(frame::HEADER_SIZE as u64)).unwrap();
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte).unwrap();
        byte[0] ^= 0xFF;
        file.seek(SeekFrom::Start(frame::HEADER_SIZE as u64)).unwrap();
        file.write_all(&byte).unwrap();
        file.sync_all().unwrap();

        assert_eq!(ledger.entries_for_year(2025).unwrap(), vec![entry(2025, 2)]);
    }

    #[test]
    fn torn_tail_is_ignored_then_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let ledger = FileHistoryLedger::open(dir.path()).unwrap();
            ledger.append(&entry(2025, 1)).unwrap();
            ledger.append(&entry(2025, 2)).unwrap();
            ledger.partition_path(2025)
        };
        let len = fs::metadata(&path).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(len - 3)
            .unwrap();

        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        assert_eq!(ledger.entries_for_year(2025).unwrap(), vec![entry(2025, 1)]);

        ledger.append(&entry(2025, 3)).unwrap();
        assert_eq!(
            ledger.entries_for_year(2025).unwrap(),
            vec![entry(2025, 3), entry(2025, 1)]
        );
    }

    fn overwrite(path: &Path, at: usize, bytes: &[u8]) {
        let mut file = OpenOptions::new().write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(at as u64)).unwrap();
        file.write_all(bytes).unwrap();
        file.sync_all().unwrap();
    }

    fn first_frame_len(path: &Path) -> usize {
        let bytes = fs::read(path).unwrap();
        frame::HEADER_SIZE + u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
    }

    #[test]
    fn damaged_first_header_keeps_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let ledger = FileHistoryLedger::open(dir.path()).unwrap();
            for n in 1..=3 {
                ledger.append(&entry(2025, n)).unwrap();
            }
            ledger.partition_path(2025)
        };
        let len = fs::metadata(&path).unwrap().len();
        overwrite(&path, 0, &u32::MAX.to_le_bytes());

        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        assert_eq!(ledger.entries_for_year(2025).unwrap().len(), 3);

        ledger.append(&entry(2025, 4)).unwrap();
        assert!(fs::metadata(&path).unwrap().len() > len);
        assert_eq!(
            ledger.entries_for_year(2025).unwrap(),
            vec![entry(2025, 4), entry(2025, 3), entry(2025, 2), entry(2025, 1)]
        );
    }

    #[test]
    fn damaged_middle_header_loses_only_that_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let ledger = FileHistoryLedger::open(dir.path()).unwrap();
            for n in 1..=3 {
                ledger.append(&entry(2025, n)).unwrap();
            }
            ledger.partition_path(2025)
        };
        let second = first_frame_len(&path);
        overwrite(&path, second, &[0u8; frame::HEADER_SIZE]);

        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        assert_eq!(
            ledger.entries_for_year(2025).unwrap(),
            vec![entry(2025, 3), entry(2025, 1)]
        );
        ledger.append(&entry(2025, 4)).unwrap();
        assert_eq!(
            ledger.entries_for_year(2025).unwrap(),
            vec![entry(2025, 4), entry(2025, 3), entry(2025, 1)]
        );
    }

    #[test]
    fn damaged_tail_refuses_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let ledger = FileHistoryLedger::open(dir.path()).unwrap();
            ledger.append(&entry(2025, 1)).unwrap();
            ledger.partition_path(2025)
        };
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0u8; frame::HEADER_SIZE]).unwrap();
        file.write_all(b"stray bytes that are not a frame").unwrap();
        file.sync_all().unwrap();
        let len = fs::metadata(&path).unwrap().len();

        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        assert_eq!(ledger.entries_for_year(2025).unwrap(), vec![entry(2025, 1)]);
        let err = ledger.append(&entry(2025, 2)).unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { .. }));
        assert_eq!(fs::metadata(&path).unwrap().len(), len);
        assert_eq!(ledger.entries_for_year(2025).unwrap(), vec![entry(2025, 1)]);
    }

    #[test]
    fn search_reads_every_partition() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileHistoryLedger::open(dir.path()).unwrap();
        ledger.append(&entry(2024, 12)).unwrap();
        ledger.append(&entry(2025, 12)).unwrap();
        ledger.append(&entry(2025, 13)).unwrap();
        let hits = ledger.search("LETTER__12").unwrap();
        assert_eq!(hits, vec![entry(2025, 12), entry(2024, 12)]);
    }
}
