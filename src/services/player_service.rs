//! Participant registration and song submission.

use std::time::SystemTime;

use tracing::info;

use crate::{
    dao::models::{SONG_ID_LENGTH, SongEntity, UserEntity, generate_id},
    dto::{
        song::{SongView, SubmitSongRequest},
        user::{RegisterRequest, UserSummary},
        validation::trimmed,
    },
    error::ServiceError,
    state::SharedState,
};

/// Register a participant under a first name nobody else holds, regardless of case.
pub async fn register(
    state: &SharedState,
    request: RegisterRequest,
) -> Result<UserSummary, ServiceError> {
    let first_name = trimmed(request.first_name.as_deref())
        .ok_or_else(|| ServiceError::InvalidInput("firstName is required".into()))?;

    let user = UserEntity::new(first_name);
    state.store().create_user(user.clone()).await?;
    info!(user_id = %user.id, first_name = %user.first_name, "participant registered");
    Ok(user.into())
}

/// Every participant in registration order.
pub async fn list_users(state: &SharedState) -> Result<Vec<UserSummary>, ServiceError> {
    let users = state.store().list_users().await?;
    Ok(users.into_iter().map(Into::into).collect())
}

/// Record the one song a participant brings to the party.
pub async fn submit_song(
    state: &SharedState,
    request: SubmitSongRequest,
) -> Result<SongView, ServiceError> {
    let missing = || ServiceError::InvalidInput("userId, title and artist are required".into());
    let user_id = trimmed(request.user_id.as_deref()).ok_or_else(missing)?;
    let title = trimmed(request.title.as_deref()).ok_or_else(missing)?;
    let artist = trimmed(request.artist.as_deref()).ok_or_else(missing)?;

    if state.store().find_user(user_id.clone()).await?.is_none() {
        return Err(ServiceError::NotFound("user not found".into()));
    }

    let song = SongEntity {
        id: generate_id(SONG_ID_LENGTH),
        user_id,
        title,
        artist,
        audio_url: trimmed(request.audio_url.as_deref()),
        played: false,
        created_at: SystemTime::now(),
    };
    state.store().create_song(song.clone()).await?;
    info!(song_id = %song.id, user_id = %song.user_id, "song submitted");
    Ok(song.into())
}

/// Every song in submission order, with its played flag.
pub async fn list_songs(state: &SharedState) -> Result<Vec<SongView>, ServiceError> {
    let songs = state.store().list_songs().await?;
    Ok(songs.into_iter().map(Into::into).collect())
}
