use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        ApiJson,
        admin::SuccessResponse,
        round::{ActiveRoundResponse, StartRoundRequest, StartRoundResponse},
    },
    error::{AppError, ErrorBody},
    services::round_service,
    state::SharedState,
};

/// Voting round endpoints. Clients poll `/api/active-vote` about once a second.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/start-vote", post(start_vote))
        .route("/api/active-vote", get(active_vote))
        .route("/api/stop-vote", post(stop_vote))
}

/// Open a timed voting round for a song.
#[utoipa::path(
    post,
    path = "/api/start-vote",
    tag = "rounds",
    request_body = StartRoundRequest,
    responses(
        (status = 200, description = "Round started", body = StartRoundResponse),
        (status = 400, description = "Missing song id", body = ErrorBody),
        (status = 404, description = "Unknown song", body = ErrorBody),
        (status = 409, description = "Another round is still live", body = ErrorBody)
    )
)]
pub async fn start_vote(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<StartRoundRequest>,
) -> Result<Json<StartRoundResponse>, AppError> {
    payload.validate()?;
    let session = round_service::start_round(&state, payload).await?;
    Ok(Json(StartRoundResponse {
        success: true,
        session,
    }))
}

/// Current round with its remaining time, or `{active:false}`.
#[utoipa::path(
    get,
    path = "/api/active-vote",
    tag = "rounds",
    responses((status = 200, description = "Current round status", body = ActiveRoundResponse))
)]
pub async fn active_vote(
    State(state): State<SharedState>,
) -> Result<Json<ActiveRoundResponse>, AppError> {
    Ok(Json(round_service::active_round(&state).await?))
}

#[utoipa::path(
    post,
    path = "/api/stop-vote",
    tag = "rounds",
    responses((status = 200, description = "Round closed (or none was live)", body = SuccessResponse))
)]
/// Close the current round early. Does nothing when no round is live.
pub async fn stop_vote(State(state): State<SharedState>) -> Result<Json<SuccessResponse>, AppError> {
    round_service::stop_round(&state).await?;
    Ok(Json(SuccessResponse::ok()))
}
