use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{RoundEntity, SongEntity, UserEntity, VoteEntity};

use super::error::MongoDaoError;

/// Fixed `_id` of the single current-round document.
pub const CURRENT_ROUND_ID: &str = "current";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    first_name: String,
    /// Lower-cased first name backing the unique index.
    first_name_key: String,
    created_at: DateTime,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            first_name_key: value.name_key(),
            id: value.id,
            first_name: value.first_name,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: value.id,
            first_name: value.first_name,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSongDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    title: String,
    artist: String,
    audio_url: Option<String>,
    #[serde(default)]
    played: bool,
    created_at: DateTime,
}

impl From<SongEntity> for MongoSongDocument {
    fn from(value: SongEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            title: value.title,
            artist: value.artist,
            audio_url: value.audio_url,
            played: value.played,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoSongDocument> for SongEntity {
    fn from(value: MongoSongDocument) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            title: value.title,
            artist: value.artist,
            audio_url: value.audio_url,
            played: value.played,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoVoteDocument {
    #[serde(rename = "_id")]
    id: String,
    voter_user_id: String,
    song_id: String,
    guessed_user_id: String,
    is_correct: bool,
    #[serde(default)]
    round_id: Option<String>,
    created_at: DateTime,
}

impl From<VoteEntity> for MongoVoteDocument {
    fn from(value: VoteEntity) -> Self {
        Self {
            id: value.id,
            voter_user_id: value.voter_user_id,
            song_id: value.song_id,
            guessed_user_id: value.guessed_user_id,
            is_correct: value.is_correct,
            round_id: value.round_id.map(|id| id.to_string()),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoVoteDocument> for VoteEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoVoteDocument) -> Result<Self, Self::Error> {
        let round_id = value.round_id.as_deref().map(parse_round_id).transpose()?;
        Ok(Self {
            id: value.id,
            voter_user_id: value.voter_user_id,
            song_id: value.song_id,
            guessed_user_id: value.guessed_user_id,
            is_correct: value.is_correct,
            round_id,
            created_at: value.created_at.to_system_time(),
        })
    }
}

/// The current round, stored under [`CURRENT_ROUND_ID`] so that at most one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    #[serde(rename = "_id")]
    id: String,
    round_id: String,
    song_id: String,
    started_at_ms: i64,
    duration_ms: i64,
    /// Denormalised so the conditional start can filter on elapsed rounds.
    ends_at_ms: i64,
    active: bool,
}

impl From<RoundEntity> for MongoRoundDocument {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: CURRENT_ROUND_ID.to_owned(),
            round_id: value.id.to_string(),
            ends_at_ms: value.ends_at_ms(),
            song_id: value.song_id,
            started_at_ms: value.started_at_ms,
            duration_ms: value.duration_ms,
            active: value.active,
        }
    }
}

impl TryFrom<MongoRoundDocument> for RoundEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRoundDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_round_id(&value.round_id)?,
            song_id: value.song_id,
            started_at_ms: value.started_at_ms,
            duration_ms: value.duration_ms,
            active: value.active,
        })
    }
}

fn parse_round_id(value: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(value).map_err(|source| MongoDaoError::InvalidRoundId {
        value: value.to_owned(),
        source,
    })
}
