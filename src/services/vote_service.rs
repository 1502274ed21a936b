//! Recording guesses. One guess per (voter, song) pair, enforced by the store.

use std::time::SystemTime;

use tracing::info;

use crate::{
    dao::models::{VOTE_ID_LENGTH, VoteEntity, generate_id},
    dto::{
        validation::trimmed,
        vote::{VoteRequest, VoteResponse},
    },
    error::ServiceError,
    services::round_service,
    state::{RoundStatus, SharedState},
};

/// Record a guess of who submitted `songId`, returning the voter's updated score.
pub async fn submit_vote(
    state: &SharedState,
    request: VoteRequest,
) -> Result<VoteResponse, ServiceError> {
    let missing =
        || ServiceError::InvalidInput("voterUserId, songId and guessedUserId are required".into());
    let voter_user_id = trimmed(request.voter_user_id.as_deref()).ok_or_else(missing)?;
    let song_id = trimmed(request.song_id.as_deref()).ok_or_else(missing)?;
    let guessed_user_id = trimmed(request.guessed_user_id.as_deref()).ok_or_else(missing)?;

    let store = state.store();
    let voter = store.find_user(voter_user_id.clone()).await?;
    let song = store.find_song(song_id.clone()).await?;
    let guessed = store.find_user(guessed_user_id.clone()).await?;
    let (Some(_), Some(song), Some(_)) = (voter, song, guessed) else {
        return Err(ServiceError::NotFound("user or song not found".into()));
    };

    if song.user_id == voter_user_id {
        return Err(ServiceError::InvalidInput(
            "you cannot vote for your own song".into(),
        ));
    }

    let round_id = match round_service::round_status(state).await? {
        RoundStatus::Live { round, .. } if round.song_id == song.id => Some(round.id),
        _ if state.config().voting_requires_live_round => {
            return Err(ServiceError::Conflict("voting is closed for this song".into()));
        }
        _ => None,
    };

    let vote = VoteEntity {
        id: generate_id(VOTE_ID_LENGTH),
        is_correct: guessed_user_id == song.user_id,
        voter_user_id,
        song_id: song.id,
        guessed_user_id,
        round_id,
        created_at: SystemTime::now(),
    };
    store.create_vote(vote.clone()).await?;

    let voter_score = store.count_correct_votes(vote.voter_user_id.clone()).await?;
    info!(
        vote_id = %vote.id,
        song_id = %vote.song_id,
        correct = vote.is_correct,
        "guess recorded"
    );

    Ok(VoteResponse {
        success: true,
        vote: vote.into(),
        voter_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::{round::StartRoundRequest, song::SubmitSongRequest, user::RegisterRequest},
        services::player_service,
        state::{AppState, ManualClock},
    };
    use std::sync::Arc;

    struct Party {
        state: SharedState,
        alice: String,
        bob: String,
        carol: String,
        bob_song: String,
    }

    async fn party(config: AppConfig) -> Party {
        let state = AppState::in_memory(config, Arc::new(ManualClock::new(1_000)));
        let mut ids = Vec::new();
        for name in ["Alice", "Bob", "Carol"] {
            let user = player_service::register(
                &state,
                RegisterRequest {
                    first_name: Some(name.into()),
                },
            )
            .await
            .unwrap();
            ids.push(user.id);
        }
        let song = player_service::submit_song(
            &state,
            SubmitSongRequest {
                user_id: Some(ids[1].clone()),
                title: Some("Africa".into()),
                artist: Some("Toto".into()),
                audio_url: None,
            },
        )
        .await
        .unwrap();
        Party {
            state,
            alice: ids[0].clone(),
            bob: ids[1].clone(),
            carol: ids[2].clone(),
            bob_song: song.id,
        }
    }

    fn guess(voter: &str, song: &str, guessed: &str) -> VoteRequest {
        VoteRequest {
            voter_user_id: Some(voter.into()),
            song_id: Some(song.into()),
            guessed_user_id: Some(guessed.into()),
        }
    }

    #[tokio::test]
    async fn correctness_follows_song_owner() {
        let p = party(AppConfig::default()).await;

        let right = submit_vote(&p.state, guess(&p.alice, &p.bob_song, &p.bob))
            .await
            .unwrap();
        assert!(right.vote.is_correct);
        assert_eq!(right.voter_score, 1);

        let wrong = submit_vote(&p.state, guess(&p.carol, &p.bob_song, &p.alice))
            .await
            .unwrap();
        assert!(!wrong.vote.is_correct);
        assert_eq!(wrong.voter_score, 0);
    }

    #[tokio::test]
    async fn owner_cannot_guess_own_song() {
        let p = party(AppConfig::default()).await;
        match submit_vote(&p.state, guess(&p.bob, &p.bob_song, &p.alice)).await {
            Err(ServiceError::InvalidInput(message)) => {
                assert_eq!(message, "you cannot vote for your own song")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_guess_on_same_song_conflicts() {
        let p = party(AppConfig::default()).await;
        submit_vote(&p.state, guess(&p.alice, &p.bob_song, &p.carol))
            .await
            .unwrap();
        assert!(matches!(
            submit_vote(&p.state, guess(&p.alice, &p.bob_song, &p.bob)).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn unknown_participants_are_not_found() {
        let p = party(AppConfig::default()).await;
        assert!(matches!(
            submit_vote(&p.state, guess("ghost", &p.bob_song, &p.bob)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn live_round_requirement_is_optional() {
        let config = AppConfig {
            voting_requires_live_round: true,
            ..AppConfig::default()
        };
        let p = party(config).await;
        match submit_vote(&p.state, guess(&p.alice, &p.bob_song, &p.bob)).await {
            Err(ServiceError::Conflict(message)) => {
                assert_eq!(message, "voting is closed for this song")
            }
            other => panic!("unexpected result: {other:?}"),
        }

        round_service::start_round(
            &p.state,
            StartRoundRequest {
                song_id: Some(p.bob_song.clone()),
            },
        )
        .await
        .unwrap();
        let vote = submit_vote(&p.state, guess(&p.alice, &p.bob_song, &p.bob))
            .await
            .unwrap();
        assert!(vote.vote.round_id.is_some());
    }
}
