//! Read-side view of the current voting round.
//!
//! Rounds expire lazily: nothing runs when the timer elapses, every read recomputes the
//! remaining time from the clock instead.

use crate::dao::models::RoundEntity;

/// What a poller sees of the current round at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundStatus {
    /// No round record, a stopped round, or an elapsed one.
    Idle,
    /// A round is accepting guesses.
    Live {
        /// The stored round.
        round: RoundEntity,
        /// Milliseconds left, always positive.
        remaining_ms: i64,
    },
}

impl RoundStatus {
    /// Evaluate the stored round record at `now_ms`.
    pub fn observe(round: Option<RoundEntity>, now_ms: i64) -> Self {
        match round {
            Some(round) if round.is_live_at(now_ms) => {
                let remaining_ms = round.remaining_ms(now_ms);
                Self::Live {
                    round,
                    remaining_ms,
                }
            }
            _ => Self::Idle,
        }
    }

    /// Whether a round is accepting guesses.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// Song being guessed, when a round is live.
    pub fn live_song_id(&self) -> Option<&str> {
        match self {
            Self::Live { round, .. } => Some(round.song_id.as_str()),
            Self::Idle => None,
        }
    }
}
