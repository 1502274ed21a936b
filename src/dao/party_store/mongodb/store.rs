use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        CURRENT_ROUND_ID, MongoRoundDocument, MongoSongDocument, MongoUserDocument,
        MongoVoteDocument,
    },
};
use crate::dao::{
    models::{RoundEntity, SongEntity, UserEntity, VoteEntity},
    party_store::PartyStore,
    storage::{StorageResult, UniqueConstraint},
};
use tracing::warn;

const USER_COLLECTION_NAME: &str = "users";
const SONG_COLLECTION_NAME: &str = "songs";
const VOTE_COLLECTION_NAME: &str = "votes";
const ROUND_COLLECTION_NAME: &str = "rounds";

/// MongoDB-backed [`PartyStore`]; uniqueness lives in unique indexes.
#[derive(Clone)]
pub struct MongoPartyStore {
    // Keeps the connection pool alive alongside the database handle.
    _client: Client,
    database: Database,
}

impl MongoPartyStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            _client: client,
            database,
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let unique_indexes: [(&'static str, &'static str, Document, &'static str); 3] = [
            (
                USER_COLLECTION_NAME,
                "user_first_name_key_idx",
                doc! {"first_name_key": 1},
                "first_name_key",
            ),
            (
                SONG_COLLECTION_NAME,
                "song_owner_idx",
                doc! {"user_id": 1},
                "user_id",
            ),
            (
                VOTE_COLLECTION_NAME,
                "vote_voter_song_idx",
                doc! {"voter_user_id": 1, "song_id": 1},
                "voter_user_id,song_id",
            ),
        ];

        for (collection_name, index_name, keys, index_label) in unique_indexes {
            let collection = self.database.collection::<Document>(collection_name);
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(index_name.to_owned()))
                        .unique(Some(true))
                        .build(),
                )
                .build();

            collection
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: collection_name,
                    index: index_label,
                    source,
                })?;
        }

        Ok(())
    }

    fn users(&self) -> Collection<MongoUserDocument> {
        self.database.collection(USER_COLLECTION_NAME)
    }

    fn songs(&self) -> Collection<MongoSongDocument> {
        self.database.collection(SONG_COLLECTION_NAME)
    }

    fn votes(&self) -> Collection<MongoVoteDocument> {
        self.database.collection(VOTE_COLLECTION_NAME)
    }

    fn rounds(&self) -> Collection<MongoRoundDocument> {
        self.database.collection(ROUND_COLLECTION_NAME)
    }

    async fn ping(&self) -> MongoResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn create_user(&self, user: UserEntity) -> MongoResult<()> {
        let document: MongoUserDocument = user.into();
        self.users().insert_one(&document).await.map_err(|source| {
            MongoDaoError::from_write(
                USER_COLLECTION_NAME,
                UniqueConstraint::UserFirstName,
                source,
            )
        })?;
        Ok(())
    }

    async fn find_user(&self, id: String) -> MongoResult<Option<UserEntity>> {
        let document = self
            .users()
            .find_one(doc! {"_id": id.as_str()})
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: USER_COLLECTION_NAME,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_users(&self) -> MongoResult<Vec<UserEntity>> {
        let documents: Vec<MongoUserDocument> =
            list_sorted(&self.users(), USER_COLLECTION_NAME).await?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn create_song(&self, song: SongEntity) -> MongoResult<()> {
        let document: MongoSongDocument = song.into();
        self.songs().insert_one(&document).await.map_err(|source| {
            MongoDaoError::from_write(SONG_COLLECTION_NAME, UniqueConstraint::SongOwner, source)
        })?;
        Ok(())
    }

    async fn find_song(&self, id: String) -> MongoResult<Option<SongEntity>> {
        let document = self
            .songs()
            .find_one(doc! {"_id": id.as_str()})
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: SONG_COLLECTION_NAME,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_songs(&self) -> MongoResult<Vec<SongEntity>> {
        let documents: Vec<MongoSongDocument> =
            list_sorted(&self.songs(), SONG_COLLECTION_NAME).await?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn create_vote(&self, vote: VoteEntity) -> MongoResult<()> {
        let document: MongoVoteDocument = vote.into();
        self.votes().insert_one(&document).await.map_err(|source| {
            MongoDaoError::from_write(VOTE_COLLECTION_NAME, UniqueConstraint::VotePerSong, source)
        })?;
        Ok(())
    }

    async fn list_votes(&self) -> MongoResult<Vec<VoteEntity>> {
        let documents: Vec<MongoVoteDocument> =
            list_sorted(&self.votes(), VOTE_COLLECTION_NAME).await?;
        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_correct_votes(&self, voter_user_id: String) -> MongoResult<u64> {
        self.votes()
            .count_documents(doc! {"voter_user_id": voter_user_id.as_str(), "is_correct": true})
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: VOTE_COLLECTION_NAME,
                source,
            })
    }

    /// Upsert the current round unless it is live, then flag the song as played.
    ///
    /// These are two writes. When the flag cannot be written the new round is withdrawn
    /// again before the error is returned, so a failed start leaves no live round.
    async fn start_round(&self, round: RoundEntity, now_ms: i64) -> MongoResult<()> {
        let song_id = round.song_id.clone();
        let round_id = round.id.to_string();
        let document: MongoRoundDocument = round.into();

        self.rounds()
            .replace_one(replaceable_round_filter(now_ms), &document)
            .upsert(true)
            .await
            .map_err(|source| {
                MongoDaoError::from_write(
                    ROUND_COLLECTION_NAME,
                    UniqueConstraint::ActiveRound,
                    source,
                )
            })?;

        let flagged = self
            .songs()
            .update_one(
                doc! {"_id": song_id.as_str()},
                doc! {"$set": {"played": true}},
            )
            .await;
        if let Err(source) = flagged {
            let withdrawn = self
                .rounds()
                .update_one(
                    owned_round_filter(&round_id),
                    doc! {"$set": {"active": false}},
                )
                .await;
            if let Err(err) = withdrawn {
                warn!(
                    song_id = %song_id,
                    error = %err,
                    "failed to withdraw round after played flag write"
                );
            }
            return Err(MongoDaoError::Write {
                collection: SONG_COLLECTION_NAME,
                source,
            });
        }

        Ok(())
    }

    async fn current_round(&self) -> MongoResult<Option<RoundEntity>> {
        let document = self
            .rounds()
            .find_one(doc! {"_id": CURRENT_ROUND_ID})
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: ROUND_COLLECTION_NAME,
                source,
            })?;
        document.map(TryInto::try_into).transpose()
    }

    async fn stop_round(&self) -> MongoResult<bool> {
        let result = self
            .rounds()
            .update_one(
                doc! {"_id": CURRENT_ROUND_ID, "active": true},
                doc! {"$set": {"active": false}},
            )
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: ROUND_COLLECTION_NAME,
                source,
            })?;
        Ok(result.modified_count > 0)
    }

    async fn reset(&self) -> MongoResult<()> {
        for collection in [
            VOTE_COLLECTION_NAME,
            SONG_COLLECTION_NAME,
            ROUND_COLLECTION_NAME,
        ] {
            self.database
                .collection::<Document>(collection)
                .delete_many(doc! {})
                .await
                .map_err(|source| MongoDaoError::Clear { collection, source })?;
        }
        Ok(())
    }
}

/// Matches the current round only while it is inactive or elapsed; otherwise the upsert
/// collides on `_id`.
fn replaceable_round_filter(now_ms: i64) -> Document {
    doc! {
        "_id": CURRENT_ROUND_ID,
        "$or": [
            {"active": false},
            {"ends_at_ms": {"$lte": now_ms}},
        ],
    }
}

/// Matches the current round only while it is still the round `round_id`.
fn owned_round_filter(round_id: &str) -> Document {
    doc! {"_id": CURRENT_ROUND_ID, "round_id": round_id}
}

async fn list_sorted<T>(collection: &Collection<T>, name: &'static str) -> MongoResult<Vec<T>>
where
    T: serde::de::DeserializeOwned + Unpin + Send + Sync,
{
    collection
        .find(doc! {})
        .sort(doc! {"created_at": 1})
        .await
        .map_err(|source| MongoDaoError::Read {
            collection: name,
            source,
        })?
        .try_collect()
        .await
        .map_err(|source| MongoDaoError::Read {
            collection: name,
            source,
        })
}

impl PartyStore for MongoPartyStore {
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_users().await.map_err(Into::into) })
    }

    fn create_song(&self, song: SongEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_song(song).await.map_err(Into::into) })
    }

    fn find_song(&self, id: String) -> BoxFuture<'static, StorageResult<Option<SongEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_song(id).await.map_err(Into::into) })
    }

    fn list_songs(&self) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_songs().await.map_err(Into::into) })
    }

    fn create_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_vote(vote).await.map_err(Into::into) })
    }

    fn list_votes(&self) -> BoxFuture<'static, StorageResult<Vec<VoteEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_votes().await.map_err(Into::into) })
    }

    fn count_correct_votes(&self, voter_user_id: String) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .count_correct_votes(voter_user_id)
                .await
                .map_err(Into::into)
        })
    }

    fn start_round(&self, round: RoundEntity, now_ms: i64) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.start_round(round, now_ms).await.map_err(Into::into) })
    }

    fn current_round(&self) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.current_round().await.map_err(Into::into) })
    }

    fn stop_round(&self) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.stop_round().await.map_err(Into::into) })
    }

    fn reset(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.reset().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_only_replaces_a_stopped_or_elapsed_round() {
        let filter = replaceable_round_filter(42);
        assert_eq!(filter.get_str("_id").unwrap(), CURRENT_ROUND_ID);
        let branches = filter.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(
            branches[1].as_document().unwrap(),
            &doc! {"ends_at_ms": {"$lte": 42_i64}}
        );
    }

    #[test]
    fn withdrawal_cannot_touch_a_newer_round() {
        let filter = owned_round_filter("3f1c");
        assert_eq!(filter, doc! {"_id": CURRENT_ROUND_ID, "round_id": "3f1c"});
    }
}
