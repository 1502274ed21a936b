use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::SongEntity,
    dto::validation::{
        AUDIO_URL_MAX_CHARS, SONG_TEXT_MAX_CHARS, limit_chars, require_text,
    },
};

/// Song submission payload.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSongRequest {
    /// Participant submitting the song.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Song title.
    #[serde(default)]
    pub title: Option<String>,
    /// Performing artist.
    #[serde(default)]
    pub artist: Option<String>,
    /// MP3 file or streaming page. Blank is treated as absent.
    #[serde(default)]
    pub audio_url: Option<String>,
}

impl Validate for SubmitSongRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (field, value) in [
            ("userId", self.user_id.as_deref()),
            ("title", self.title.as_deref()),
            ("artist", self.artist.as_deref()),
        ] {
            if let Err(e) = require_text(field, value) {
                errors.add(field, e);
            }
        }

        for (field, value, max) in [
            ("title", self.title.as_deref(), SONG_TEXT_MAX_CHARS),
            ("artist", self.artist.as_deref(), SONG_TEXT_MAX_CHARS),
            ("audioUrl", self.audio_url.as_deref(), AUDIO_URL_MAX_CHARS),
        ] {
            if let Some(text) = value {
                if let Err(e) = limit_chars(field, text, max) {
                    errors.add(field, e);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A submitted song as exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongView {
    /// Song identifier.
    pub id: String,
    /// Owner of the song.
    pub user_id: String,
    /// Song title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Link to the audio, when one was given.
    pub audio_url: Option<String>,
    /// Whether a round has been started for this song.
    pub played: bool,
}

impl From<SongEntity> for SongView {
    fn from(value: SongEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            title: value.title,
            artist: value.artist,
            audio_url: value.audio_url,
            played: value.played,
        }
    }
}

/// Answer to a successful song submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitSongResponse {
    /// Always `true`.
    pub success: bool,
    /// The stored song.
    pub song: SongView,
}
