use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        ApiJson,
        song::{SongView, SubmitSongRequest, SubmitSongResponse},
        user::{RegisterRequest, RegisterResponse, UserSummary},
    },
    error::{AppError, ErrorBody},
    services::player_service,
    state::SharedState,
};

/// Registration and song submission endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/users", get(list_users))
        .route("/api/submit-song", post(submit_song))
        .route("/api/songs", get(list_songs))
}

/// Register a participant by first name.
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "players",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Participant registered", body = RegisterResponse),
        (status = 400, description = "Missing or invalid first name", body = ErrorBody),
        (status = 409, description = "First name already taken", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    payload.validate()?;
    let user = player_service::register(&state, payload).await?;
    Ok(Json(RegisterResponse {
        success: true,
        user,
    }))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "players",
    responses((status = 200, description = "Participants in registration order", body = [UserSummary]))
)]
/// List participants in registration order.
pub async fn list_users(
    State(state): State<SharedState>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(player_service::list_users(&state).await?))
}

/// Submit the participant's song.
#[utoipa::path(
    post,
    path = "/api/submit-song",
    tag = "players",
    request_body = SubmitSongRequest,
    responses(
        (status = 200, description = "Song recorded", body = SubmitSongResponse),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 409, description = "User already submitted a song", body = ErrorBody)
    )
)]
pub async fn submit_song(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<SubmitSongRequest>,
) -> Result<Json<SubmitSongResponse>, AppError> {
    payload.validate()?;
    let song = player_service::submit_song(&state, payload).await?;
    Ok(Json(SubmitSongResponse {
        success: true,
        song,
    }))
}

#[utoipa::path(
    get,
    path = "/api/songs",
    tag = "players",
    responses((status = 200, description = "Songs in submission order", body = [SongView]))
)]
/// List submitted songs, including their played flag.
pub async fn list_songs(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SongView>>, AppError> {
    Ok(Json(player_service::list_songs(&state).await?))
}
