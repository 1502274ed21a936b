use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{RoundEntity, SongEntity},
    dto::validation::require_text,
};

/// Request to open a voting round for a song.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartRoundRequest {
    /// Song to play.
    #[serde(default)]
    pub song_id: Option<String>,
}

impl Validate for StartRoundRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = require_text("songId", self.song_id.as_deref()) {
            errors.add("songId", e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Timing of a freshly started round.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundSession {
    /// Song being played.
    pub song_id: String,
    /// Epoch milliseconds.
    pub start_time: i64,
    /// Milliseconds.
    pub duration: i64,
}

impl From<&RoundEntity> for RoundSession {
    fn from(value: &RoundEntity) -> Self {
        Self {
            song_id: value.song_id.clone(),
            start_time: value.started_at_ms,
            duration: value.duration_ms,
        }
    }
}

/// Answer to a successful round start.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartRoundResponse {
    /// Always `true`.
    pub success: bool,
    /// The new round.
    pub session: RoundSession,
}

/// Song details shown while it is being guessed. The owner is deliberately absent.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundSong {
    /// Song identifier.
    pub id: String,
    /// Song title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Link to the audio, when one was given.
    pub audio_url: Option<String>,
}

impl From<SongEntity> for RoundSong {
    fn from(value: SongEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            artist: value.artist,
            audio_url: value.audio_url,
        }
    }
}

/// Polled view of the current round: `{active:false}` or the live round details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRoundResponse {
    /// Whether a round is live.
    pub active: bool,
    /// Song being played.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_id: Option<String>,
    /// Details of the song being played.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song: Option<RoundSong>,
    /// Epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Milliseconds left before the round closes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
    /// Round length in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl ActiveRoundResponse {
    /// No live round.
    pub fn inactive() -> Self {
        Self {
            active: false,
            song_id: None,
            song: None,
            start_time: None,
            remaining: None,
            duration: None,
        }
    }

    /// Live round for `song` with `remaining_ms` left.
    pub fn live(round: &RoundEntity, song: SongEntity, remaining_ms: i64) -> Self {
        Self {
            active: true,
            song_id: Some(round.song_id.clone()),
            song: Some(song.into()),
            start_time: Some(round.started_at_ms),
            remaining: Some(remaining_ms),
            duration: Some(round.duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inactive_round_serializes_to_flag_only() {
        let value = serde_json::to_value(ActiveRoundResponse::inactive()).unwrap();
        assert_eq!(value, json!({"active": false}));
    }
}
