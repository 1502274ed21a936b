//! In-process [`PartyStore`] used when no durable backend is configured or reachable.

use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::dao::{
    models::{RoundEntity, SongEntity, UserEntity, VoteEntity},
    party_store::PartyStore,
    storage::{StorageError, StorageResult, UniqueConstraint},
};

/// Volatile store keeping every collection behind one lock, so each check-then-insert is atomic.
#[derive(Clone, Default)]
pub struct MemoryPartyStore {
    inner: Arc<RwLock<MemoryData>>,
}

#[derive(Default)]
struct MemoryData {
    users: IndexMap<String, UserEntity>,
    songs: IndexMap<String, SongEntity>,
    votes: Vec<VoteEntity>,
    round: Option<RoundEntity>,
}

impl MemoryPartyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartyStore for MemoryPartyStore {
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut data = inner.write().await;
            let key = user.name_key();
            if data.users.values().any(|existing| existing.name_key() == key) {
                return Err(StorageError::UniqueViolation(
                    UniqueConstraint::UserFirstName,
                ));
            }
            data.users.insert(user.id.clone(), user);
            Ok(())
        })
    }

    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.users.get(&id).cloned()) })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.users.values().cloned().collect()) })
    }

    fn create_song(&self, song: SongEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut data = inner.write().await;
            if data
                .songs
                .values()
                .any(|existing| existing.user_id == song.user_id)
            {
                return Err(StorageError::UniqueViolation(UniqueConstraint::SongOwner));
            }
            data.songs.insert(song.id.clone(), song);
            Ok(())
        })
    }

    fn find_song(&self, id: String) -> BoxFuture<'static, StorageResult<Option<SongEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.songs.get(&id).cloned()) })
    }

    fn list_songs(&self) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.songs.values().cloned().collect()) })
    }

    fn create_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut data = inner.write().await;
            if data.votes.iter().any(|existing| {
                existing.voter_user_id == vote.voter_user_id && existing.song_id == vote.song_id
            }) {
                return Err(StorageError::UniqueViolation(UniqueConstraint::VotePerSong));
            }
            data.votes.push(vote);
            Ok(())
        })
    }

    fn list_votes(&self) -> BoxFuture<'static, StorageResult<Vec<VoteEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.votes.clone()) })
    }

    fn count_correct_votes(&self, voter_user_id: String) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let data = inner.read().await;
            let count = data
                .votes
                .iter()
                .filter(|vote| vote.voter_user_id == voter_user_id && vote.is_correct)
                .count();
            Ok(count as u64)
        })
    }

    fn start_round(&self, round: RoundEntity, now_ms: i64) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut data = inner.write().await;
            if data
                .round
                .as_ref()
                .is_some_and(|current| current.is_live_at(now_ms))
            {
                return Err(StorageError::UniqueViolation(UniqueConstraint::ActiveRound));
            }
            if let Some(song) = data.songs.get_mut(&round.song_id) {
                song.played = true;
            }
            data.round = Some(round);
            Ok(())
        })
    }

    fn current_round(&self) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.round.clone()) })
    }

    fn stop_round(&self) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut data = inner.write().await;
            match data.round.as_mut() {
                Some(round) if round.active => {
                    round.active = false;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn reset(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut data = inner.write().await;
            data.songs.clear();
            data.votes.clear();
            data.round = None;
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn song_for(owner: &UserEntity, id: &str) -> SongEntity {
        SongEntity {
            id: id.into(),
            user_id: owner.id.clone(),
            title: "Song".into(),
            artist: "Artist".into(),
            audio_url: None,
            played: false,
            created_at: SystemTime::now(),
        }
    }

    fn vote(voter: &UserEntity, song_id: &str, guessed: &UserEntity) -> VoteEntity {
        VoteEntity {
            id: crate::dao::models::generate_id(12),
            voter_user_id: voter.id.clone(),
            song_id: song_id.into(),
            guessed_user_id: guessed.id.clone(),
            is_correct: false,
            round_id: None,
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn first_names_are_unique_without_regard_to_case() {
        let store = MemoryPartyStore::new();
        store.create_user(UserEntity::new("Alice".into())).await.unwrap();

        let err = store
            .create_user(UserEntity::new("aLiCe".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::UniqueViolation(UniqueConstraint::UserFirstName)
        ));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn users_are_listed_in_registration_order() {
        let store = MemoryPartyStore::new();
        for name in ["Zoe", "Alice", "Marc"] {
            store.create_user(UserEntity::new(name.into())).await.unwrap();
        }
        let names: Vec<_> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|user| user.first_name)
            .collect();
        assert_eq!(names, ["Zoe", "Alice", "Marc"]);
    }

    #[tokio::test]
    async fn one_song_per_owner() {
        let store = MemoryPartyStore::new();
        let alice = UserEntity::new("Alice".into());
        store.create_song(song_for(&alice, "s1")).await.unwrap();

        let err = store.create_song(song_for(&alice, "s2")).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::UniqueViolation(UniqueConstraint::SongOwner)
        ));
    }

    #[tokio::test]
    async fn one_vote_per_voter_and_song() {
        let store = MemoryPartyStore::new();
        let alice = UserEntity::new("Alice".into());
        let bob = UserEntity::new("Bob".into());

        store.create_vote(vote(&bob, "s1", &alice)).await.unwrap();
        store.create_vote(vote(&bob, "s2", &alice)).await.unwrap();
        let err = store.create_vote(vote(&bob, "s1", &bob)).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::UniqueViolation(UniqueConstraint::VotePerSong)
        ));
        assert_eq!(store.list_votes().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn live_round_blocks_a_second_start_until_it_elapses() {
        let store = MemoryPartyStore::new();
        let alice = UserEntity::new("Alice".into());
        store.create_song(song_for(&alice, "s1")).await.unwrap();

        store
            .start_round(RoundEntity::start("s1".into(), 0, 20_000), 0)
            .await
            .unwrap();
        assert!(store.find_song("s1".into()).await.unwrap().unwrap().played);

        let err = store
            .start_round(RoundEntity::start("s1".into(), 5_000, 20_000), 5_000)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::UniqueViolation(UniqueConstraint::ActiveRound)
        ));

        store
            .start_round(RoundEntity::start("s1".into(), 20_000, 20_000), 20_000)
            .await
            .unwrap();
        assert_eq!(
            store.current_round().await.unwrap().unwrap().started_at_ms,
            20_000
        );
    }

    #[tokio::test]
    async fn stop_round_is_idempotent() {
        let store = MemoryPartyStore::new();
        assert!(!store.stop_round().await.unwrap());

        store
            .start_round(RoundEntity::start("s1".into(), 0, 20_000), 0)
            .await
            .unwrap();
        assert!(store.stop_round().await.unwrap());
        assert!(!store.stop_round().await.unwrap());
        assert!(!store.current_round().await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn reset_keeps_users() {
        let store = MemoryPartyStore::new();
        let alice = UserEntity::new("Alice".into());
        let bob = UserEntity::new("Bob".into());
        store.create_user(alice.clone()).await.unwrap();
        store.create_user(bob.clone()).await.unwrap();
        store.create_song(song_for(&alice, "s1")).await.unwrap();
        store.create_vote(vote(&bob, "s1", &alice)).await.unwrap();
        store
            .start_round(RoundEntity::start("s1".into(), 0, 20_000), 0)
            .await
            .unwrap();

        store.reset().await.unwrap();

        assert_eq!(store.list_users().await.unwrap().len(), 2);
        assert!(store.list_songs().await.unwrap().is_empty());
        assert!(store.list_votes().await.unwrap().is_empty());
        assert!(store.current_round().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_writers_get_exactly_one_success() {
        let store = MemoryPartyStore::new();
        let alice = UserEntity::new("Alice".into());
        let bob = UserEntity::new("Bob".into());

        let handles: Vec<_> = (0..32)
            .map(|attempt| {
                let store = store.clone();
                let vote = vote(&bob, "s1", &alice);
                let song = song_for(&alice, &format!("s{attempt}"));
                let round = RoundEntity::start(format!("s{attempt}"), 0, 20_000);
                tokio::spawn(async move {
                    (
                        store.create_vote(vote).await.is_ok(),
                        store.create_song(song).await.is_ok(),
                        store.start_round(round, 0).await.is_ok(),
                    )
                })
            })
            .collect();

        let mut wins = (0, 0, 0);
        for handle in handles {
            let (vote, song, round) = handle.await.unwrap();
            wins.0 += usize::from(vote);
            wins.1 += usize::from(song);
            wins.2 += usize::from(round);
        }
        assert_eq!(wins, (1, 1, 1));
        assert_eq!(store.list_votes().await.unwrap().len(), 1);
        assert_eq!(store.list_songs().await.unwrap().len(), 1);
    }
}
