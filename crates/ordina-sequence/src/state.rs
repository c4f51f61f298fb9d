use serde::{Deserialize, Serialize};

/// Persisted counter state: `{"year": 2025, "lastNumber": 41}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceState {
    pub year: i32,
    pub last_number: u64,
}

impl SequenceState {
    /// A fresh counter for `year`.
    pub fn fresh(year: i32) -> Self {
        Self {
            year,
            last_number: 0,
        }
    }

    /// The state after allocating one number in `current_year`.
    ///
    /// Returns `None` on counter overflow.
    pub fn advanced(self, current_year: i32) -> Option<Self> {
        let base = if self.year == current_year {
            self
        } else {
            Self::fresh(current_year)
        };
        Some(Self {
            year: base.year,
            last_number: base.last_number.checked_add(1)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_same_year() {
        let state = SequenceState {
            year: 2025,
            last_number: 41,
        };
        assert_eq!(
            state.advanced(2025),
            Some(SequenceState {
                year: 2025,
                last_number: 42
            })
        );
    }

    #[test]
    fn advance_rolls_over() {
        let state = SequenceState {
            year: 2024,
            last_number: 900,
        };
        assert_eq!(state.advanced(2025), Some(SequenceState::fresh(2025).advanced(2025).unwrap()));
        assert_eq!(state.advanced(2025).unwrap().last_number, 1);
    }

    #[test]
    fn advance_overflow() {
        let state = SequenceState {
            year: 2025,
            last_number: u64::MAX,
        };
        assert_eq!(state.advanced(2025), None);
    }

    #[test]
    fn json_shape() {
        let state = SequenceState {
            year: 2025,
            last_number: 41,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"year":2025,"lastNumber":41}"#);
    }
}
