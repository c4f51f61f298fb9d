use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::error::{SequenceError, SequenceResult};
use crate::state::SequenceState;

/// Stable storage for the counter state.
///
/// Implementations must make `save` durable before returning `Ok`; the store
/// relies on that to decide whether an allocation happened.
pub trait SequenceBackend: Send + Sync {
    /// Load the last saved state, or `None` if nothing was ever saved.
    fn load(&self) -> SequenceResult<Option<SequenceState>>;

    /// Durably replace the saved state.
    fn save(&self, state: &SequenceState) -> SequenceResult<()>;
}

/// Volatile backend for tests and embedding.
///
/// Writes can be made to fail on demand to exercise rollback paths.
#[derive(Debug, Default)]
pub struct InMemorySequenceBackend {
    state: RwLock<Option<SequenceState>>,
    fail_writes: AtomicBool,
}

impl InMemorySequenceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-saved state.
    pub fn with_state(state: SequenceState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// While `true`, every `save` fails with [`SequenceError::PersistFailed`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The last successfully saved state.
    pub fn saved(&self) -> Option<SequenceState> {
        *self.state.read().expect("lock poisoned")
    }
}

impl SequenceBackend for InMemorySequenceBackend {
    fn load(&self) -> SequenceResult<Option<SequenceState>> {
        Ok(self.saved())
    }

    fn save(&self, state: &SequenceState) -> SequenceResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SequenceError::PersistFailed("write rejected by backend".into()));
        }
        *self.state.write().expect("lock poisoned") = Some(*state);
        Ok(())
    }
}

impl<T: SequenceBackend + ?Sized> SequenceBackend for std::sync::Arc<T> {
    fn load(&self) -> SequenceResult<Option<SequenceState>> {
        (**self).load()
    }

    fn save(&self, state: &SequenceState) -> SequenceResult<()> {
        (**self).save(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_backend_loads_none() {
        let backend = InMemorySequenceBackend::new();
        assert_eq!(backend.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let backend = InMemorySequenceBackend::new();
        let state = SequenceState {
            year: 2025,
            last_number: 3,
        };
        backend.save(&state).unwrap();
        assert_eq!(backend.load().unwrap(), Some(state));
    }

    #[test]
    fn failing_writes_keep_previous_state() {
        let backend = InMemorySequenceBackend::with_state(SequenceState::fresh(2025));
        backend.set_fail_writes(true);
        let err = backend
            .save(&SequenceState {
                year: 2025,
                last_number: 1,
            })
            .unwrap_err();
        assert!(matches!(err, SequenceError::PersistFailed(_)));
        assert_eq!(backend.saved(), Some(SequenceState::fresh(2025)));
    }
}
