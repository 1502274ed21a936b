//! Lifecycle of the single voting round: start, poll, stop.
//!
//! Starts and stops are serialised in-process by the state's round gate; across processes the
//! store's conditional write decides which start wins.

use tracing::{debug, info};

use crate::{
    dao::models::RoundEntity,
    dto::{
        round::{ActiveRoundResponse, RoundSession, StartRoundRequest},
        validation::trimmed,
    },
    error::ServiceError,
    state::{RoundStatus, SharedState},
};

/// Open a round for `songId`, rejecting the request while another round is live.
pub async fn start_round(
    state: &SharedState,
    request: StartRoundRequest,
) -> Result<RoundSession, ServiceError> {
    let song_id = trimmed(request.song_id.as_deref())
        .ok_or_else(|| ServiceError::InvalidInput("songId is required".into()))?;

    state
        .run_round_transition(|| async {
            let song = state
                .store()
                .find_song(song_id.clone())
                .await?
                .ok_or_else(|| ServiceError::NotFound("song not found".into()))?;

            let now_ms = state.now_ms();
            let round = RoundEntity::start(song.id, now_ms, state.config().round_duration_ms);
            state.store().start_round(round.clone(), now_ms).await?;

            info!(
                round_id = %round.id,
                song_id = %round.song_id,
                duration_ms = round.duration_ms,
                "voting round started"
            );
            Ok::<_, ServiceError>(RoundSession::from(&round))
        })
        .await
}

/// Current round status as seen at this instant.
pub async fn round_status(state: &SharedState) -> Result<RoundStatus, ServiceError> {
    let round = state.store().current_round().await?;
    Ok(RoundStatus::observe(round, state.now_ms()))
}

/// Polled view of the round. A live round whose song vanished reads as inactive.
pub async fn active_round(state: &SharedState) -> Result<ActiveRoundResponse, ServiceError> {
    let RoundStatus::Live {
        round,
        remaining_ms,
    } = round_status(state).await?
    else {
        return Ok(ActiveRoundResponse::inactive());
    };

    match state.store().find_song(round.song_id.clone()).await? {
        Some(song) => Ok(ActiveRoundResponse::live(&round, song, remaining_ms)),
        None => {
            debug!(song_id = %round.song_id, "live round points at a missing song");
            Ok(ActiveRoundResponse::inactive())
        }
    }
}

/// Close the current round. Stopping when nothing is live is a no-op.
pub async fn stop_round(state: &SharedState) -> Result<(), ServiceError> {
    state
        .run_round_transition(|| async {
            if state.store().stop_round().await? {
                info!("voting round stopped");
            } else {
                debug!("stop requested with no active round");
            }
            Ok::<_, ServiceError>(())
        })
        .await
}
