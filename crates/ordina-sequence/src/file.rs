use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::backend::SequenceBackend;
use crate::error::{SequenceError, SequenceResult};
use crate::state::SequenceState;

/// JSON file backend.
///
/// Every save goes to a temporary file in the same directory, is fsynced, and
/// is renamed over the previous state, so a crash leaves either the old or the
/// new state on disk, never a torn one.
#[derive(Clone, Debug)]
pub struct FileSequenceBackend {
    path: PathBuf,
}

impl FileSequenceBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl SequenceBackend for FileSequenceBackend {
    fn load(&self) -> SequenceResult<Option<SequenceState>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = serde_json::from_str(&raw).map_err(|e| SequenceError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(state))
    }

    fn save(&self, state: &SequenceState) -> SequenceResult<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir)?;

        let payload = serde_json::to_vec_pretty(state)
            .map_err(|e| SequenceError::PersistFailed(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&payload)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| SequenceError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            year = state.year,
            last_number = state.last_number,
            "sequence state persisted"
        );
        Ok(())
    }
}
