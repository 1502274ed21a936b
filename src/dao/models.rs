use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Length of generated participant identifiers.
pub const USER_ID_LENGTH: usize = 8;
/// Length of generated song identifiers.
pub const SONG_ID_LENGTH: usize = 10;
/// Length of generated vote identifiers.
pub const VOTE_ID_LENGTH: usize = 12;

/// Generate an opaque alphanumeric identifier of the requested length.
pub fn generate_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Normalised key used to enforce case-insensitive first name uniqueness.
pub fn first_name_key(first_name: &str) -> String {
    first_name.trim().to_lowercase()
}

/// Registered participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Opaque identifier handed to the client after registration.
    pub id: String,
    /// Display name, trimmed, unique without regard to case.
    pub first_name: String,
    /// Registration timestamp, used to keep listings in sign-up order.
    pub created_at: SystemTime,
}

impl UserEntity {
    /// Build a new participant with a freshly generated identifier.
    pub fn new(first_name: String) -> Self {
        Self {
            id: generate_id(USER_ID_LENGTH),
            first_name,
            created_at: SystemTime::now(),
        }
    }

    /// Key enforcing case-insensitive uniqueness of the first name.
    pub fn name_key(&self) -> String {
        first_name_key(&self.first_name)
    }
}

/// Song submitted by a participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongEntity {
    /// Opaque identifier.
    pub id: String,
    /// Identifier of the participant who submitted the song.
    pub user_id: String,
    /// Song title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Optional link to the audio resource (MP3 or streaming page).
    pub audio_url: Option<String>,
    /// Set once a round has been started for this song.
    pub played: bool,
    /// Submission timestamp, used to keep listings in order.
    pub created_at: SystemTime,
}

/// Guess recorded for a song.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteEntity {
    /// Opaque identifier.
    pub id: String,
    /// Participant who guessed.
    pub voter_user_id: String,
    /// Song that was guessed.
    pub song_id: String,
    /// Participant named in the guess.
    pub guessed_user_id: String,
    /// Computed once at write time: the guessed user owns the song.
    pub is_correct: bool,
    /// Round that was live for this song when the guess was recorded, if any.
    pub round_id: Option<Uuid>,
    /// Recording timestamp.
    pub created_at: SystemTime,
}

/// The single "current round" record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Distinguishes successive rounds, also for the same song.
    pub id: Uuid,
    /// Song being played.
    pub song_id: String,
    /// Unix epoch milliseconds at which the round started.
    pub started_at_ms: i64,
    /// Length of the round.
    pub duration_ms: i64,
    /// Cleared by an explicit stop; elapsed rounds keep `true` (lazy expiry).
    pub active: bool,
}

impl RoundEntity {
    /// Start a new round for `song_id` at `now_ms`.
    pub fn start(song_id: String, now_ms: i64, duration_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            song_id,
            started_at_ms: now_ms,
            duration_ms,
            active: true,
        }
    }

    /// Instant (epoch ms) at which the round stops accepting guesses.
    pub fn ends_at_ms(&self) -> i64 {
        self.started_at_ms.saturating_add(self.duration_ms)
    }

    /// Milliseconds left at `now_ms`; zero or negative once elapsed.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.ends_at_ms() - now_ms
    }

    /// Whether the round is still running at `now_ms`.
    pub fn is_live_at(&self, now_ms: i64) -> bool {
        self.active && self.remaining_ms(now_ms) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_have_requested_length() {
        let id = generate_id(USER_ID_LENGTH);
        assert_eq!(id.len(), USER_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_id(VOTE_ID_LENGTH), generate_id(VOTE_ID_LENGTH));
    }

    #[test]
    fn first_name_key_ignores_case_and_padding() {
        assert_eq!(first_name_key("  Alice "), "alice");
        assert_eq!(first_name_key("ÉLODIE"), "élodie");
    }

    #[test]
    fn stopped_round_is_never_live() {
        let mut round = RoundEntity::start("song".into(), 1_000, 20_000);
        assert!(round.is_live_at(1_000));
        round.active = false;
        assert!(!round.is_live_at(1_000));
    }
}
