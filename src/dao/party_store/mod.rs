#[cfg(feature = "couch-store")]
pub(crate) mod couchdb;
/// In-process store.
pub mod memory;
#[cfg(feature = "mongo-store")]
pub(crate) mod mongodb;

use crate::dao::models::{RoundEntity, SongEntity, UserEntity, VoteEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for participants, songs, votes and the current round.
///
/// Uniqueness rules are the backend's responsibility: a violated rule surfaces as
/// [`StorageError::UniqueViolation`](crate::dao::storage::StorageError::UniqueViolation)
/// and nothing is written.
pub trait PartyStore: Send + Sync {
    /// Insert a participant; fails when the first name is taken (case-insensitive).
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Participant with identifier `id`.
    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// All participants in registration order.
    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    /// Insert a song; fails when its owner already submitted one.
    fn create_song(&self, song: SongEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Song with identifier `id`.
    fn find_song(&self, id: String) -> BoxFuture<'static, StorageResult<Option<SongEntity>>>;
    /// All songs in submission order.
    fn list_songs(&self) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>>;
    /// Insert a vote; fails when the voter already guessed that song.
    fn create_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// All votes in recording order.
    fn list_votes(&self) -> BoxFuture<'static, StorageResult<Vec<VoteEntity>>>;
    /// Number of correct guesses recorded for `voter_user_id`.
    fn count_correct_votes(&self, voter_user_id: String) -> BoxFuture<'static, StorageResult<u64>>;
    /// Replace the current round with `round` unless a round is still live at `now_ms`, then
    /// flag the round's song as played. The replacement is a single conditional write; the
    /// played flag is a second write, and when it fails the new round is withdrawn before the
    /// error is returned.
    fn start_round(&self, round: RoundEntity, now_ms: i64) -> BoxFuture<'static, StorageResult<()>>;
    /// The current round record, live or not.
    fn current_round(&self) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Deactivate the current round; returns whether a live flag was cleared.
    fn stop_round(&self) -> BoxFuture<'static, StorageResult<bool>>;
    /// Remove every song, vote and the round record. Participants are kept.
    fn reset(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap round trip to the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
