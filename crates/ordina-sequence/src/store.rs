use std::fmt;
use std::sync::{Arc, Mutex};

use ordina_types::Clock;
use tracing::{debug, info};

use crate::backend::{InMemorySequenceBackend, SequenceBackend};
use crate::error::{SequenceError, SequenceResult};
use crate::state::SequenceState;

/// Per-year protocol counter.
///
/// See the crate docs for the allocation rules.
pub struct SequenceStore {
    state: Mutex<SequenceState>,
    backend: Box<dyn SequenceBackend>,
    clock: Arc<dyn Clock>,
}

impl SequenceStore {
    /// Load the persisted state, defaulting to `{current year, 0}`.
    pub fn open(
        backend: impl SequenceBackend + 'static,
        clock: Arc<dyn Clock>,
    ) -> SequenceResult<Self> {
        let state = match backend.load()? {
            Some(state) => state,
            None => SequenceState::fresh(clock.year()),
        };
        debug!(year = state.year, last_number = state.last_number, "sequence loaded");
        Ok(Self {
            state: Mutex::new(state),
            backend: Box::new(backend),
            clock,
        })
    }

    /// A store over a fresh [`InMemorySequenceBackend`].
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(SequenceState::fresh(clock.year())),
            backend: Box::new(InMemorySequenceBackend::new()),
            clock,
        }
    }

    /// Allocate the next `(year, number)`.
    ///
    /// Rolls the counter over when the clock's year differs from the stored
    /// year. The new state is persisted before the lock is released; on
    /// failure nothing is consumed.
    pub fn next(&self) -> SequenceResult<(i32, u64)> {
        let mut state = self.state.lock().expect("sequence lock poisoned");
        let current_year = self.clock.year();
        let candidate = state
            .advanced(current_year)
            .ok_or(SequenceError::Overflow(current_year))?;

        self.backend.save(&candidate)?;

        if candidate.year != state.year {
            info!(from = state.year, to = candidate.year, "protocol year rollover");
        }
        *state = candidate;
        debug!(year = candidate.year, number = candidate.last_number, "protocol number allocated");
        Ok((candidate.year, candidate.last_number))
    }

    /// The stored `(year, last number)` without allocating.
    pub fn peek(&self) -> (i32, u64) {
        let state = self.state.lock().expect("sequence lock poisoned");
        (state.year, state.last_number)
    }

    /// Set the counter to `{year, 0}` and return the state it replaced.
    ///
    /// Only the stored year or the clock's current year can be reset. Any
    /// other year has no live counter here, so the state is left untouched
    /// and returned as is; rewriting it would make `next()` roll over and
    /// hand out numbers of the live year a second time.
    ///
    /// Confirmation is the caller's job. On persistence failure the previous
    /// state is kept.
    pub fn reset(&self, year: i32) -> SequenceResult<SequenceState> {
        let mut state = self.state.lock().expect("sequence lock poisoned");
        let previous = *state;
        let current_year = self.clock.year();
        if year != previous.year && year != current_year {
            info!(
                year,
                stored_year = previous.year,
                current_year,
                "reset of an inactive year leaves the counter unchanged"
            );
            return Ok(previous);
        }
        let fresh = SequenceState::fresh(year);
        self.backend.save(&fresh)?;
        *state = fresh;
        info!(
            year,
            previous_year = previous.year,
            previous_last_number = previous.last_number,
            "protocol sequence reset"
        );
        Ok(previous)
    }
}

impl fmt::Debug for SequenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, last_number) = self.peek();
        f.debug_struct("SequenceStore")
            .field("year", &year)
            .field("last_number", &last_number)
            .finish()
    }
}
