use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        ApiJson,
        results::ResultsResponse,
        vote::{VoteRequest, VoteResponse},
    },
    error::{AppError, ErrorBody},
    services::{results_service, vote_service},
    state::SharedState,
};

/// Guess and scoreboard endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/vote", post(vote))
        .route("/api/results", get(results))
}

/// Guess who submitted a song.
#[utoipa::path(
    post,
    path = "/api/vote",
    tag = "votes",
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Guess recorded", body = VoteResponse),
        (status = 400, description = "Missing ids or vote on own song", body = ErrorBody),
        (status = 404, description = "Unknown user or song", body = ErrorBody),
        (status = 409, description = "Song already guessed by this voter", body = ErrorBody)
    )
)]
pub async fn vote(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<VoteRequest>,
) -> Result<Json<VoteResponse>, AppError> {
    payload.validate()?;
    Ok(Json(vote_service::submit_vote(&state, payload).await?))
}

/// Scores, per-song tallies and every raw vote.
#[utoipa::path(
    get,
    path = "/api/results",
    tag = "votes",
    responses((status = 200, description = "Aggregated results", body = ResultsResponse))
)]
pub async fn results(State(state): State<SharedState>) -> Result<Json<ResultsResponse>, AppError> {
    Ok(Json(results_service::compute_results(&state).await?))
}
