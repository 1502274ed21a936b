//! Scoreboard and per-song tallies, recomputed from the raw records on every read.

use std::collections::{HashMap, HashSet};

use crate::{
    dto::results::{ResolvedVote, ResultsResponse, ScoreEntry, SongResult},
    error::ServiceError,
    state::SharedState,
};

/// Users, songs, votes and scores as of now.
pub async fn compute_results(state: &SharedState) -> Result<ResultsResponse, ServiceError> {
    let store = state.store();
    let users = store.list_users().await?;
    let songs = store.list_songs().await?;
    let votes = store.list_votes().await?;

    let names: HashMap<&str, &str> = users
        .iter()
        .map(|user| (user.id.as_str(), user.first_name.as_str()))
        .collect();
    let name_of = |id: &str| names.get(id).map(|name| (*name).to_owned());

    let mut correct_by_voter: HashMap<&str, u64> = HashMap::new();
    for vote in votes.iter().filter(|vote| vote.is_correct) {
        *correct_by_voter.entry(vote.voter_user_id.as_str()).or_default() += 1;
    }

    let scores = users
        .iter()
        .map(|user| ScoreEntry {
            user_id: user.id.clone(),
            first_name: user.first_name.clone(),
            score: correct_by_voter
                .get(user.id.as_str())
                .copied()
                .unwrap_or_default(),
        })
        .collect();

    let total_users = users.len();
    let song_results = songs
        .into_iter()
        .map(|song| {
            let song_votes: Vec<_> = votes.iter().filter(|vote| vote.song_id == song.id).collect();
            let voter_count = song_votes
                .iter()
                .map(|vote| vote.voter_user_id.as_str())
                .collect::<HashSet<_>>()
                .len();
            let resolved = song_votes
                .into_iter()
                .map(|vote| ResolvedVote {
                    voter_user_id: vote.voter_user_id.clone(),
                    voter_first_name: name_of(vote.voter_user_id.as_str()),
                    guessed_user_id: vote.guessed_user_id.clone(),
                    guessed_first_name: name_of(vote.guessed_user_id.as_str()),
                    is_correct: vote.is_correct,
                })
                .collect();
            SongResult {
                song: song.into(),
                voter_count,
                total_users,
                votes: resolved,
            }
        })
        .collect();

    let vote_views = votes.iter().cloned().map(Into::into).collect();
    let user_views = users.iter().cloned().map(Into::into).collect();

    Ok(ResultsResponse {
        users: user_views,
        songs: song_results,
        votes: vote_views,
        scores,
    })
}
