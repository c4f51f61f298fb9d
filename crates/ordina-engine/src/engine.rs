use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, RwLock};

use ordina_ledger::{FileHistoryLedger, HistoryLedger, InMemoryHistoryLedger};
use ordina_render::{StampRenderer, StampSpec};
use ordina_sequence::{FileSequenceBackend, SequenceStore};
use ordina_stamp::{FormatDispatcher, StampError, StamperSet};
use ordina_types::{
    AdminAction, AdminRecord, Clock, HistoryEntry, ProtocolNumber, SystemClock,
};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::outcome::{Artifact, StampOutcome, StampPhase};
use crate::paths::OutputPathResolver;

/// Numbering, stamping and history behind one handle.
///
/// `Send + Sync`; share it behind an `Arc`. Concurrent [`stamp`](Self::stamp)
/// calls never receive the same protocol number.
pub struct ProtocolEngine {
    config: RwLock<Arc<EngineConfig>>,
    sequence: SequenceStore,
    ledger: Arc<dyn HistoryLedger>,
    clock: Arc<dyn Clock>,
    stampers: StamperSet,
}

impl ProtocolEngine {
    /// Assemble an engine from explicit parts.
    ///
    /// `sequence` should have been opened with the same `clock`, otherwise the
    /// stamp timestamp and the allocated year can disagree.
    pub fn new(
        config: EngineConfig,
        sequence: SequenceStore,
        ledger: Arc<dyn HistoryLedger>,
        clock: Arc<dyn Clock>,
    ) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(Arc::new(config)),
            sequence,
            ledger,
            clock,
            stampers: StamperSet::new(),
        })
    }

    /// File-backed engine under `config.state_dir`, on the system clock.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.state_dir).map_err(|e| {
            EngineError::InvalidConfig(format!(
                "state directory {} cannot be created: {e}",
                config.state_dir.display()
            ))
        })?;
        let sequence = SequenceStore::open(
            FileSequenceBackend::new(config.sequence_path()),
            clock.clone(),
        )?;
        let ledger =
            FileHistoryLedger::open(config.history_dir()).map_err(EngineError::LedgerReadFailure)?;
        info!(state_dir = %config.state_dir.display(), "protocol engine opened");
        Self::new(config, sequence, Arc::new(ledger), clock)
    }

    /// Volatile engine: in-memory counter and ledger.
    pub fn in_memory(config: EngineConfig, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        let sequence = SequenceStore::in_memory(clock.clone());
        let ledger = Arc::new(InMemoryHistoryLedger::new());
        Self::new(config, sequence, ledger, clock)
    }

    // ---- Configuration ----

    /// The snapshot the next call will use.
    pub fn config(&self) -> Arc<EngineConfig> {
        self.config.read().expect("config lock poisoned").clone()
    }

    /// Swap the configuration for later calls. Calls already running keep
    /// their snapshot.
    pub fn update_config(&self, config: EngineConfig) -> EngineResult<()> {
        config.validate()?;
        config.load_seal()?;
        *self.config.write().expect("config lock poisoned") = Arc::new(config);
        info!("configuration updated");
        Ok(())
    }

    // ---- Stamping ----

    /// Allocate the next protocol number, stamp `source` with it and record
    /// the result.
    ///
    /// Failures before allocation leave no trace. After allocation the number
    /// is spent whatever happens; the error reports it through
    /// [`EngineError::burned_number`].
    pub fn stamp(&self, source: &Path) -> EngineResult<StampOutcome> {
        let config = self.config();
        let mut phase = StampPhase::Idle;

        // Pre-flight: nothing below allocates or writes.
        match fs::metadata(source) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(EngineError::SourceUnreadable {
                    path: source.to_path_buf(),
                    reason: "not a regular file".into(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EngineError::SourceNotFound(source.to_path_buf()))
            }
            Err(e) => {
                return Err(EngineError::SourceUnreadable {
                    path: source.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }
        let format = FormatDispatcher::select(source).map_err(|e| match e {
            StampError::UnsupportedFormat { extension, .. } => EngineError::UnsupportedFormat {
                path: source.to_path_buf(),
                extension,
            },
            other => EngineError::InvalidConfig(other.to_string()),
        })?;
        let source_bytes = fs::read(source).map_err(|e| EngineError::SourceUnreadable {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
        let renderer = StampRenderer::from_style(&config.stamp.style)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        let seal = config.load_seal()?;

        let (year, number) = self.sequence.next()?;
        let protocol = config.protocol_format.render(year, number);
        transition(&mut phase, StampPhase::NumberAllocated, &protocol);

        let now = self.clock.now();
        let spec = StampSpec::new(protocol.clone(), now, &config.stamp.style, seal);
        let buffer = renderer.render(&spec);
        transition(&mut phase, StampPhase::Rendered, &protocol);

        let stamped = self
            .stampers
            .for_format(format)
            .apply(&source_bytes, &buffer, spec.position)
            .map_err(|source_err| {
                burn(&mut phase, &protocol, &source_err);
                EngineError::MalformedDocument {
                    protocol: protocol.clone(),
                    source: source_err,
                }
            })?;
        transition(&mut phase, StampPhase::Stamped, &protocol);

        let resolver = OutputPathResolver::new(&config.output_root);
        let output_path = resolver.path_for(source, year, number);
        resolver
            .resolve(source, year, number)
            .and_then(|_| write_atomically(&output_path, &stamped))
            .map_err(|e| {
                burn(&mut phase, &protocol, &e);
                EngineError::OutputWriteFailure {
                    protocol: protocol.clone(),
                    path: output_path.clone(),
                    reason: e.to_string(),
                }
            })?;

        let entry = HistoryEntry::new(&protocol, now, output_path.display().to_string());
        self.ledger.append(&entry).map_err(|e| {
            burn(&mut phase, &protocol, &e);
            warn!(
                protocol = %protocol,
                path = %output_path.display(),
                "artifact written without history entry"
            );
            EngineError::LedgerWriteFailure {
                protocol: protocol.clone(),
                path: output_path.clone(),
                source: e,
            }
        })?;
        transition(&mut phase, StampPhase::Recorded, &protocol);

        let artifact = Artifact {
            source_path: source.to_path_buf(),
            output_path,
            format,
            bytes: stamped,
        };
        transition(&mut phase, StampPhase::Done, &protocol);
        info!(
            protocol = %protocol,
            year,
            number,
            format = ?format,
            path = %artifact.output_path.display(),
            digest = %artifact.digest(),
            "document stamped"
        );
        Ok(StampOutcome { protocol, artifact })
    }

    // ---- History ----

    pub fn history_for_year(&self, year: i32) -> EngineResult<Vec<HistoryEntry>> {
        self.ledger
            .entries_for_year(year)
            .map_err(EngineError::LedgerReadFailure)
    }

    /// Case-insensitive search over every year, newest year first.
    pub fn search_history(&self, text: &str) -> EngineResult<Vec<HistoryEntry>> {
        self.ledger.search(text).map_err(EngineError::LedgerReadFailure)
    }

    /// Years with recorded history, newest first.
    pub fn available_years(&self) -> EngineResult<Vec<i32>> {
        self.ledger.years().map_err(EngineError::LedgerReadFailure)
    }

    pub fn admin_records(&self) -> EngineResult<Vec<AdminRecord>> {
        self.ledger
            .admin_records()
            .map_err(EngineError::LedgerReadFailure)
    }

    // ---- Administration ----

    /// `(year, last number)` as stored, without allocating.
    pub fn current_sequence(&self) -> (i32, u64) {
        self.sequence.peek()
    }

    /// Restart the counter at zero for `year`. The next stamp gets number 1.
    ///
    /// Only the stored or current year has a live counter; resetting any other
    /// year changes nothing but is still journaled.
    ///
    /// Confirmation is the caller's job. Previously issued numbers stay in the
    /// history, so a reset year can contain duplicate protocol strings.
    pub fn reset_sequence(&self, year: i32) -> EngineResult<()> {
        let previous = self.sequence.reset(year)?;
        self.journal(AdminAction::SequenceReset {
            year,
            previous_year: previous.year,
            previous_last_number: previous.last_number,
        })
    }

    /// Drop every history entry of `year`. Returns whether there were any.
    ///
    /// Artifacts on disk are left alone.
    pub fn delete_history(&self, year: i32) -> EngineResult<bool> {
        let existed = self
            .ledger
            .delete_year(year)
            .map_err(EngineError::AdminWriteFailure)?;
        info!(year, existed, "history deleted");
        self.journal(AdminAction::HistoryDeleted { year, existed })?;
        Ok(existed)
    }

    fn journal(&self, action: AdminAction) -> EngineResult<()> {
        let record = AdminRecord::new(action, self.clock.now());
        self.ledger
            .append_admin(&record)
            .map_err(EngineError::AdminWriteFailure)
    }
}

impl std::fmt::Debug for ProtocolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolEngine")
            .field("sequence", &self.sequence)
            .field("config", &self.config())
            .finish_non_exhaustive()
    }
}

fn transition(phase: &mut StampPhase, next: StampPhase, protocol: &ProtocolNumber) {
    debug!(from = %phase, to = %next, protocol = %protocol, "stamp phase");
    *phase = next;
}

fn burn(phase: &mut StampPhase, protocol: &ProtocolNumber, reason: &dyn std::fmt::Display) {
    warn!(
        phase = %phase,
        protocol = %protocol,
        year = protocol.year,
        number = protocol.number,
        reason = %reason,
        "protocol number burned"
    );
    *phase = StampPhase::Failed;
}

/// Write to a sibling temp file, fsync, then link into place. An existing
/// file at `path` is never replaced.
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no parent"))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use image::{ImageFormat, Rgba, RgbaImage};
    use ordina_sequence::{InMemorySequenceBackend, SequenceState};
    use ordina_types::{FixedClock, ProtocolFormat};
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn at(year: i32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, 11, 3)
            .unwrap()
            .and_hms_opt(16, 45, 12)
            .unwrap()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    struct Harness {
        dir: TempDir,
        engine: ProtocolEngine,
        backend: Arc<InMemorySequenceBackend>,
        ledger: Arc<InMemoryHistoryLedger>,
        clock: Arc<FixedClock>,
    }

    impl Harness {
        fn new(last: u64) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let clock = Arc::new(FixedClock::new(at(2025)));
            let backend = Arc::new(InMemorySequenceBackend::with_state(SequenceState {
                year: 2025,
                last_number: last,
            }));
            let sequence = SequenceStore::open(backend.clone(), clock.clone()).unwrap();
            let ledger = Arc::new(InMemoryHistoryLedger::new());
            let config = EngineConfig {
                output_root: dir.path().join("out"),
                state_dir: dir.path().join("state"),
                ..EngineConfig::default()
            };
            let engine =
                ProtocolEngine::new(config, sequence, ledger.clone(), clock.clone()).unwrap();
            Self {
                dir,
                engine,
                backend,
                ledger,
                clock,
            }
        }

        fn source(&self, name: &str, bytes: &[u8]) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, bytes).unwrap();
            path
        }
    }

    #[test]
    fn stamps_png_and_records() {
        let h = Harness::new(41);
        let source = h.source("scan.png", &png(240, 160));

        let outcome = h.engine.stamp(&source).unwrap();
        assert_eq!(outcome.protocol.formatted, "42/2025");
        let expected = h.dir.path().join("out/2025/scan__42.png");
        assert_eq!(outcome.artifact.output_path, expected);
        assert_eq!(fs::read(&expected).unwrap(), outcome.artifact.bytes);
        assert_ne!(outcome.artifact.bytes, fs::read(&source).unwrap());

        let stamped = image::load_from_memory(&outcome.artifact.bytes).unwrap();
        assert_eq!((stamped.width(), stamped.height()), (240, 160));

        let history = h.engine.history_for_year(2025).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].protocol_number, "42/2025");
        assert_eq!(history[0].date, "03/11/2025");
        assert_eq!(history[0].time, "16:45:12");
        assert_eq!(history[0].output_path, expected.display().to_string());
        assert_eq!(h.engine.current_sequence(), (2025, 42));
    }

    #[test]
    fn preflight_failures_consume_nothing() {
        let h = Harness::new(5);

        let missing = h.dir.path().join("missing.pdf");
        assert!(matches!(
            h.engine.stamp(&missing),
            Err(EngineError::SourceNotFound(_))
        ));

        let text = h.source("notes.txt", b"hello");
        assert!(matches!(
            h.engine.stamp(&text),
            Err(EngineError::UnsupportedFormat { ref extension, .. }) if extension == "txt"
        ));

        assert!(matches!(
            h.engine.stamp(h.dir.path()),
            Err(EngineError::SourceUnreadable { .. })
        ));

        assert_eq!(h.engine.current_sequence(), (2025, 5));
        assert_eq!(h.backend.saved().unwrap().last_number, 5);
        assert!(h.engine.available_years().unwrap().is_empty());
    }

    #[test]
    fn malformed_document_burns_its_number() {
        let h = Harness::new(0);
        let broken = h.source("broken.png", b"not really a png");

        let err = h.engine.stamp(&broken).unwrap_err();
        assert!(matches!(err, EngineError::MalformedDocument { .. }));
        assert_eq!(err.burned_number().unwrap().number, 1);
        assert!(h.engine.history_for_year(2025).unwrap().is_empty());
        assert!(!h.dir.path().join("out/2025/broken__1.png").exists());

        let good = h.source("good.png", &png(64, 64));
        let outcome = h.engine.stamp(&good).unwrap();
        assert_eq!(outcome.protocol.number, 2);
    }

    #[test]
    fn sequence_failure_touches_nothing() {
        let h = Harness::new(9);
        let source = h.source("a.png", &png(64, 64));
        h.backend.set_fail_writes(true);

        let err = h.engine.stamp(&source).unwrap_err();
        assert!(matches!(err, EngineError::SequencePersistFailure(_)));
        assert!(err.burned_number().is_none());
        assert!(!h.dir.path().join("out").exists());

        h.backend.set_fail_writes(false);
        assert_eq!(h.engine.stamp(&source).unwrap().protocol.number, 10);
    }

    #[test]
    fn ledger_failure_keeps_artifact() {
        let h = Harness::new(0);
        let source = h.source("a.png", &png(64, 64));
        h.ledger.set_fail_writes(true);

        let err = h.engine.stamp(&source).unwrap_err();
        match &err {
            EngineError::LedgerWriteFailure { protocol, path, .. } => {
                assert_eq!(protocol.number, 1);
                assert!(path.exists());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.burned_number().unwrap().formatted, "1/2025");
    }

    #[test]
    fn output_never_overwritten() {
        let h = Harness::new(0);
        let source = h.source("a.png", &png(64, 64));
        let squatter = h.dir.path().join("out/2025/a__1.png");
        fs::create_dir_all(squatter.parent().unwrap()).unwrap();
        fs::write(&squatter, b"keep me").unwrap();

        let err = h.engine.stamp(&source).unwrap_err();
        assert!(matches!(err, EngineError::OutputWriteFailure { .. }));
        assert_eq!(fs::read(&squatter).unwrap(), b"keep me");
        assert_eq!(h.engine.stamp(&source).unwrap().protocol.number, 2);
    }

    #[test]
    fn year_rollover_restarts_numbering() {
        let h = Harness::new(120);
        let source = h.source("a.png", &png(64, 64));
        h.clock.set(at(2026));

        let outcome = h.engine.stamp(&source).unwrap();
        assert_eq!(outcome.protocol.formatted, "1/2026");
        assert!(outcome.artifact.output_path.ends_with("2026/a__1.png"));
        assert_eq!(h.engine.available_years().unwrap(), vec![2026]);
    }

    #[test]
    fn reset_and_delete_are_journaled() {
        let h = Harness::new(41);
        let source = h.source("a.png", &png(64, 64));
        h.engine.stamp(&source).unwrap();

        h.engine.reset_sequence(2025).unwrap();
        assert_eq!(h.engine.current_sequence(), (2025, 0));
        assert_eq!(h.engine.stamp(&source).unwrap().protocol.number, 1);

        assert!(h.engine.delete_history(2025).unwrap());
        assert!(!h.engine.delete_history(2025).unwrap());
        assert!(h.engine.history_for_year(2025).unwrap().is_empty());

        let records = h.engine.admin_records().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().any(|r| r.action
            == AdminAction::SequenceReset {
                year: 2025,
                previous_year: 2025,
                previous_last_number: 42,
            }));
        assert!(records
            .iter()
            .any(|r| r.action == AdminAction::HistoryDeleted { year: 2025, existed: true }));
    }

    #[test]
    fn reset_of_past_year_does_not_reuse_numbers() {
        let h = Harness::new(41);
        let source = h.source("a.png", &png(64, 64));

        h.engine.reset_sequence(2024).unwrap();
        assert_eq!(h.engine.current_sequence(), (2025, 41));
        assert_eq!(h.engine.stamp(&source).unwrap().protocol.formatted, "42/2025");

        let records = h.engine.admin_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].action,
            AdminAction::SequenceReset {
                year: 2024,
                previous_year: 2025,
                previous_last_number: 41,
            }
        );
    }

    #[test]
    fn search_spans_years() {
        let h = Harness::new(0);
        let invoice = h.source("invoice.png", &png(64, 64));
        let receipt = h.source("receipt.png", &png(64, 64));
        h.engine.stamp(&invoice).unwrap();
        h.clock.set(at(2026));
        h.engine.stamp(&receipt).unwrap();
        h.engine.stamp(&invoice).unwrap();

        let found = h.engine.search_history("INVOICE").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].year, 2026);
        assert_eq!(found[1].year, 2025);
        assert_eq!(h.engine.available_years().unwrap(), vec![2026, 2025]);
    }

    #[test]
    fn config_update_applies_to_later_calls() {
        let h = Harness::new(6);
        let source = h.source("a.png", &png(64, 64));
        let mut config = (*h.engine.config()).clone();
        config.protocol_format = ProtocolFormat::parse("PROT-{year}-{number:05d}").unwrap();
        h.engine.update_config(config).unwrap();

        assert_eq!(h.engine.stamp(&source).unwrap().protocol.formatted, "PROT-2025-00007");

        let mut bad = (*h.engine.config()).clone();
        bad.stamp.seal_path = Some(h.dir.path().join("no-seal.png"));
        assert!(matches!(
            h.engine.update_config(bad),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!(h.engine.config().stamp.seal_path.is_none());
    }

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProtocolEngine>();
    }
}
