use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Up,
    Down,
}

impl Voice {
    pub fn value(self) -> i32 {
        match self {
            Voice::Up => 1,
            Voice::Down => -1,
        }
    }
}

impl TryFrom<i32> for Voice {
    type Error = AppError;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Voice::Up),
            -1 => Ok(Voice::Down),
            other => Err(AppError::Validation(format!(
                "voice must be -1 or 1, got {}",
                other
            ))),
        }
    }
}

/// What a cast did to the ledger row, and therefore to the thread aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Created(Voice),
    Changed(Voice),
    Unchanged,
}

impl VoteOutcome {
    /// Amount to add to the thread's aggregate. A flip swings by two.
    pub fn delta(self) -> i32 {
        match self {
            VoteOutcome::Created(voice) => voice.value(),
            VoteOutcome::Changed(voice) => 2 * voice.value(),
            VoteOutcome::Unchanged => 0,
        }
    }
}

#[derive(Debug, Validate, Deserialize)]
pub struct VoteRequest {
    #[validate(length(min = 1))]
    pub nickname: String,
    pub voice: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_swings_by_two() {
        assert_eq!(VoteOutcome::Created(Voice::Up).delta(), 1);
        assert_eq!(VoteOutcome::Changed(Voice::Up).delta(), 2);
        assert_eq!(VoteOutcome::Changed(Voice::Down).delta(), -2);
        assert_eq!(VoteOutcome::Unchanged.delta(), 0);
    }

    #[test]
    fn only_unit_voices_are_accepted() {
        assert_eq!(Voice::try_from(-1).ok(), Some(Voice::Down));
        assert!(Voice::try_from(0).is_err());
        assert!(Voice::try_from(2).is_err());
    }
}
