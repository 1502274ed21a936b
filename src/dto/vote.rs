use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{dao::models::VoteEntity, dto::validation::require_text};

/// A participant's guess of who submitted a song.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// Participant making the guess.
    #[serde(default)]
    pub voter_user_id: Option<String>,
    /// Song being guessed.
    #[serde(default)]
    pub song_id: Option<String>,
    /// Participant believed to own the song.
    #[serde(default)]
    pub guessed_user_id: Option<String>,
}

impl Validate for VoteRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("voterUserId", self.voter_user_id.as_deref()),
            ("songId", self.song_id.as_deref()),
            ("guessedUserId", self.guessed_user_id.as_deref()),
        ] {
            if let Err(e) = require_text(field, value) {
                errors.add(field, e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A recorded guess.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
    /// Vote identifier.
    pub id: String,
    /// Participant who guessed.
    pub voter_user_id: String,
    /// Song that was guessed.
    pub song_id: String,
    /// Participant named in the guess.
    pub guessed_user_id: String,
    /// Whether the guessed participant owns the song.
    pub is_correct: bool,
    /// Round that was live for the song when the guess was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_id: Option<Uuid>,
}

impl From<VoteEntity> for VoteView {
    fn from(value: VoteEntity) -> Self {
        Self {
            id: value.id,
            voter_user_id: value.voter_user_id,
            song_id: value.song_id,
            guessed_user_id: value.guessed_user_id,
            is_correct: value.is_correct,
            round_id: value.round_id,
        }
    }
}

/// Answer to a recorded guess.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    /// Always `true`.
    pub success: bool,
    /// The stored guess.
    pub vote: VoteView,
    /// Correct guesses of the voter so far, this one included.
    pub voter_score: u64,
}
