use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::{song::SongView, user::UserSummary, vote::VoteView};

/// Score line of one participant.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    /// Participant identifier.
    pub user_id: String,
    /// Participant name.
    pub first_name: String,
    /// Number of correct guesses.
    pub score: u64,
}

/// A vote on a song with both participants' names resolved.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVote {
    /// Participant who guessed.
    pub voter_user_id: String,
    /// Name of the voter, `null` when unknown.
    pub voter_first_name: Option<String>,
    /// Participant named in the guess.
    pub guessed_user_id: String,
    /// Name of the guessed participant, `null` when unknown.
    pub guessed_first_name: Option<String>,
    /// Whether the guess was right.
    pub is_correct: bool,
}

/// A song with its tally.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongResult {
    /// Song fields, flattened.
    #[serde(flatten)]
    pub song: SongView,
    /// Distinct participants who guessed this song.
    pub voter_count: usize,
    /// Registered participants.
    pub total_users: usize,
    /// Guesses made for this song.
    pub votes: Vec<ResolvedVote>,
}

/// Full scoreboard, recomputed on every read.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResultsResponse {
    /// Participants in registration order.
    pub users: Vec<UserSummary>,
    /// Songs with their tallies.
    pub songs: Vec<SongResult>,
    /// Every recorded guess.
    pub votes: Vec<VoteView>,
    /// Correct guesses per participant.
    pub scores: Vec<ScoreEntry>,
}
