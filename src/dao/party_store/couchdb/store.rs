use std::{future::Future, sync::Arc};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::{debug, warn};

use crate::dao::{
    models::{RoundEntity, SongEntity, UserEntity, VoteEntity},
    party_store::PartyStore,
    storage::{StorageError, StorageResult, UniqueConstraint},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, BulkDocResult, BulkDocs, Claim, CouchDocRef, CouchDocument,
        CouchRoundDocument, CouchSongDocument, CouchUserDocument, CouchVoteDocument,
        DeletedDocument, END_SUFFIX, OWNER_PREFIX, ROUND_DOC_ID, SONG_PREFIX, USER_PREFIX,
        VOTE_PREFIX, WriteResponse, name_claim_id, owner_claim_id, song_doc_id, user_doc_id,
        vote_doc_id, voter_vote_prefix,
    },
};

/// Attempts made when a read-modify-write races another writer on the same document.
const REVISION_RETRIES: usize = 3;

/// CouchDB-backed [`PartyStore`].
///
/// Records live under id-derived document ids (`user::<id>`, `song::<id>`) so lookups are a
/// single GET. Uniqueness comes from claim documents with deterministic ids (`name::<key>`,
/// `owner::<user id>`, `vote::<voter>::<song>`): a second create of the same id is answered
/// with `409 Conflict`.
#[derive(Clone)]
pub struct CouchPartyStore {
    client: Client,
    database_url: Arc<Url>,
    auth: Option<Arc<(String, String)>>,
}

impl CouchPartyStore {
    /// Connect to CouchDB, creating the database when it does not exist yet.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let raw_url = config.database_url();
        let database_url = Url::parse(&raw_url).map_err(|err| CouchDaoError::InvalidUrl {
            url: raw_url.clone(),
            reason: err.to_string(),
        })?;
        if database_url.cannot_be_a_base() {
            return Err(CouchDaoError::InvalidUrl {
                url: raw_url,
                reason: "not a hierarchical URL".into(),
            });
        }

        let store = Self {
            client,
            database_url: Arc::new(database_url),
            auth: config.credentials.map(Arc::new),
        };
        store.ensure_database(&config.database).await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth.as_deref() {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    /// Build a request against `path` inside the database; the path is percent-encoded as a
    /// single segment so first names with reserved characters stay addressable.
    fn request(&self, method: Method, path: &str) -> CouchResult<reqwest::RequestBuilder> {
        let mut url = Url::clone(&self.database_url);
        url.path_segments_mut()
            .map_err(|_| CouchDaoError::InvalidUrl {
                url: self.database_url.to_string(),
                reason: "not a hierarchical URL".into(),
            })?
            .pop_if_empty()
            .push(path);
        Ok(self.authorize(self.client.request(method, url)))
    }

    async fn ensure_database(&self, database: &str) -> CouchResult<()> {
        let url = Url::clone(&self.database_url);
        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.to_owned(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.to_owned(),
                        source,
                    })?;
                // 412 means a concurrent creator won the race.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database: database.to_owned(),
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database: database.to_owned(),
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)?
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_owned(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_owned(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_owned(),
                status: other,
            }),
        }
    }

    /// Write `document` and return its new revision; a taken id or a stale `_rev` yields
    /// [`CouchDaoError::Conflict`].
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<String>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)?
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_owned(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                path: doc_id.to_owned(),
            }),
            status if status.is_success() => response
                .json::<WriteResponse>()
                .await
                .map(|written| written.rev)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_owned(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_owned(),
                status: other,
            }),
        }
    }

    async fn delete_document(&self, doc_id: &str, rev: &str) -> CouchResult<()> {
        let response = self
            .request(Method::DELETE, doc_id)?
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_owned(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                path: doc_id.to_owned(),
            }),
            status if status.is_success() || status == StatusCode::NOT_FOUND => Ok(()),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_owned(),
                status: other,
            }),
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let start_key = serde_json::to_string(prefix).map_err(|source| {
            CouchDaoError::DeserializeValue {
                path: ALL_DOCS.to_owned(),
                source,
            }
        })?;
        let end_key = serde_json::to_string(&format!("{prefix}{END_SUFFIX}")).map_err(
            |source| CouchDaoError::DeserializeValue {
                path: ALL_DOCS.to_owned(),
                source,
            },
        )?;
        let query = [
            ("include_docs", "true".to_owned()),
            ("startkey", start_key),
            ("endkey", end_key),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)?
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_owned(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_owned(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_owned(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: ALL_DOCS.to_owned(),
                    source,
                })
            })
            .collect()
    }

    /// Claim `claim_id` for `record`, then write the record. The claim is released again
    /// when the record write fails, so the key stays available.
    async fn create_claimed<T>(
        &self,
        claim_id: String,
        record: CouchDocument<T>,
        constraint: UniqueConstraint,
    ) -> StorageResult<()>
    where
        T: Serialize,
    {
        let claim = CouchDocument::fresh(
            claim_id,
            Claim {
                holder: record.id.clone(),
            },
        );
        let claim_rev = self
            .put_document(&claim.id, &claim)
            .await
            .map_err(|err| err.claimed(constraint))?;

        if let Err(err) = self.put_document(&record.id, &record).await {
            if let Err(release) = self.delete_document(&claim.id, &claim_rev).await {
                warn!(claim = %claim.id, error = %release, "failed to release claim");
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn list_users(&self) -> CouchResult<Vec<UserEntity>> {
        let mut users: Vec<UserEntity> = self
            .list_documents::<CouchUserDocument>(USER_PREFIX)
            .await?
            .into_iter()
            .map(|doc| doc.body)
            .collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn list_songs(&self) -> CouchResult<Vec<SongEntity>> {
        let mut songs: Vec<SongEntity> = self
            .list_documents::<CouchSongDocument>(SONG_PREFIX)
            .await?
            .into_iter()
            .map(|doc| doc.body)
            .collect();
        songs.sort_by_key(|song| song.created_at);
        Ok(songs)
    }

    async fn votes_with_prefix(&self, prefix: &str) -> CouchResult<Vec<VoteEntity>> {
        let mut votes: Vec<VoteEntity> = self
            .list_documents::<CouchVoteDocument>(prefix)
            .await?
            .into_iter()
            .map(|doc| doc.body)
            .collect();
        votes.sort_by_key(|vote| vote.created_at);
        Ok(votes)
    }

    /// Replace the round document unless it is live, then flag the song as played.
    ///
    /// These are two document writes. When the flag cannot be written the new round is
    /// withdrawn again before the error is returned, so a failed start leaves no live round.
    async fn start_round(&self, round: RoundEntity, now_ms: i64) -> StorageResult<()> {
        let existing = self
            .get_document::<CouchRoundDocument>(ROUND_DOC_ID)
            .await?;
        let rev = match existing {
            Some(doc) if doc.body.is_live_at(now_ms) => {
                return Err(StorageError::UniqueViolation(UniqueConstraint::ActiveRound));
            }
            Some(doc) => doc.rev,
            None => None,
        };

        let song_id = round.song_id.clone();
        let mut document = CouchDocument {
            id: ROUND_DOC_ID.to_owned(),
            rev,
            body: round,
        };
        // A concurrent start moves the revision, so the loser sees 409.
        let round_rev = self
            .put_document(ROUND_DOC_ID, &document)
            .await
            .map_err(|err| err.claimed(UniqueConstraint::ActiveRound))?;

        if let Err(err) = self.mark_played(&song_id).await {
            document.rev = Some(round_rev);
            document.body.active = false;
            if let Err(withdraw) = self.put_document(ROUND_DOC_ID, &document).await {
                warn!(
                    song_id = %song_id,
                    error = %withdraw,
                    "failed to withdraw round after played flag write"
                );
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn mark_played(&self, song_id: &str) -> CouchResult<()> {
        let doc_id = song_doc_id(song_id);
        let doc_id = doc_id.as_str();
        retry_on_conflict(move || self.try_mark_played(doc_id)).await
    }

    async fn try_mark_played(&self, doc_id: &str) -> CouchResult<()> {
        let Some(mut doc) = self.get_document::<CouchSongDocument>(doc_id).await? else {
            return Ok(());
        };
        if doc.body.played {
            return Ok(());
        }
        doc.body.played = true;
        self.put_document(doc_id, &doc).await.map(|_| ())
    }

    async fn stop_round(&self) -> CouchResult<bool> {
        retry_on_conflict(move || self.try_stop_round()).await
    }

    async fn try_stop_round(&self) -> CouchResult<bool> {
        let Some(mut doc) = self
            .get_document::<CouchRoundDocument>(ROUND_DOC_ID)
            .await?
        else {
            return Ok(false);
        };
        if !doc.body.active {
            return Ok(false);
        }
        doc.body.active = false;
        self.put_document(ROUND_DOC_ID, &doc).await.map(|_| true)
    }

    /// Delete votes, songs, owner claims and the round. Rows whose revision moved between
    /// the listing and the delete are picked up again by the next pass.
    async fn reset(&self) -> CouchResult<()> {
        retry_on_conflict(move || self.try_reset()).await
    }

    async fn try_reset(&self) -> CouchResult<()> {
        const BULK_DOCS: &str = "_bulk_docs";
        let mut docs: Vec<DeletedDocument> = Vec::new();
        for prefix in [VOTE_PREFIX, SONG_PREFIX, OWNER_PREFIX] {
            let refs = self.list_documents::<CouchDocRef>(prefix).await?;
            docs.extend(refs.into_iter().map(Into::into));
        }
        if let Some(round) = self.get_document::<CouchDocRef>(ROUND_DOC_ID).await? {
            docs.push(round.into());
        }
        if docs.is_empty() {
            return Ok(());
        }

        let response = self
            .request(Method::POST, BULK_DOCS)?
            .json(&BulkDocs { docs })
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: BULK_DOCS.to_owned(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: BULK_DOCS.to_owned(),
                status: response.status(),
            });
        }

        let results = response
            .json::<Vec<BulkDocResult>>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: BULK_DOCS.to_owned(),
                source,
            })?;
        check_bulk_results(results)
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = Url::clone(&self.database_url);
        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url.to_string(),
                status: response.status(),
            })
        }
    }
}

/// Run `attempt` again while it reports a revision conflict, up to [`REVISION_RETRIES`]
/// times; the last conflict is returned to the caller.
async fn retry_on_conflict<T, F, Fut>(mut attempt: F) -> CouchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CouchResult<T>>,
{
    let mut attempts = 1;
    loop {
        match attempt().await {
            Err(CouchDaoError::Conflict { path }) if attempts < REVISION_RETRIES => {
                debug!(path = %path, attempts, "document revision moved; retrying");
                attempts += 1;
            }
            Err(err @ CouchDaoError::Conflict { .. }) => {
                warn!(error = %err, attempts, "giving up after repeated revision conflicts");
                return Err(err);
            }
            other => return other,
        }
    }
}

/// `_bulk_docs` answers 201 even when rows fail; the first failed row becomes the error.
fn check_bulk_results(results: Vec<BulkDocResult>) -> CouchResult<()> {
    match results.into_iter().find(|row| row.error.is_some()) {
        None => Ok(()),
        Some(BulkDocResult {
            id,
            error: Some(error),
            ..
        }) if error == "conflict" => Err(CouchDaoError::Conflict { path: id }),
        Some(BulkDocResult { id, error, reason }) => Err(CouchDaoError::BulkRejected {
            id,
            error: error.unwrap_or_default(),
            reason,
        }),
    }
}

impl PartyStore for CouchPartyStore {
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let claim_id = name_claim_id(&user);
            let record = CouchDocument::fresh(user_doc_id(&user.id), user);
            store
                .create_claimed(claim_id, record, UniqueConstraint::UserFirstName)
                .await
        })
    }

    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchUserDocument>(&user_doc_id(&id))
                .await?;
            Ok(doc.map(|doc| doc.body))
        })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_users().await.map_err(Into::into) })
    }

    fn create_song(&self, song: SongEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let claim_id = owner_claim_id(&song);
            let record = CouchDocument::fresh(song_doc_id(&song.id), song);
            store
                .create_claimed(claim_id, record, UniqueConstraint::SongOwner)
                .await
        })
    }

    fn find_song(&self, id: String) -> BoxFuture<'static, StorageResult<Option<SongEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchSongDocument>(&song_doc_id(&id))
                .await?;
            Ok(doc.map(|doc| doc.body))
        })
    }

    fn list_songs(&self) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_songs().await.map_err(Into::into) })
    }

    fn create_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchDocument::fresh(vote_doc_id(&vote), vote);
            store
                .put_document(&doc.id, &doc)
                .await
                .map(|_| ())
                .map_err(|err| err.claimed(UniqueConstraint::VotePerSong))
        })
    }

    fn list_votes(&self) -> BoxFuture<'static, StorageResult<Vec<VoteEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .votes_with_prefix(VOTE_PREFIX)
                .await
                .map_err(Into::into)
        })
    }

    fn count_correct_votes(&self, voter_user_id: String) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let votes = store
                .votes_with_prefix(&voter_vote_prefix(&voter_user_id))
                .await?;
            Ok(votes.iter().filter(|vote| vote.is_correct).count() as u64)
        })
    }

    fn start_round(&self, round: RoundEntity, now_ms: i64) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.start_round(round, now_ms).await })
    }

    fn current_round(&self) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchRoundDocument>(ROUND_DOC_ID)
                .await?;
            Ok(doc.map(|doc| doc.body))
        })
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
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn conflict() -> CouchDaoError {
        CouchDaoError::Conflict {
            path: ROUND_DOC_ID.into(),
        }
    }

    #[tokio::test]
    async fn persistent_conflicts_are_reported_not_swallowed() {
        let calls = AtomicUsize::new(0);
        let result: CouchResult<()> = retry_on_conflict(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(conflict()) }
        })
        .await;

        assert!(matches!(result, Err(CouchDaoError::Conflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), REVISION_RETRIES);
    }

    #[tokio::test]
    async fn conflict_then_success_is_retried() {
        let calls = AtomicUsize::new(0);
        let result = retry_on_conflict(|| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move { if call == 0 { Err(conflict()) } else { Ok(call) } }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: CouchResult<()> = retry_on_conflict(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(CouchDaoError::RequestStatus {
                    path: "song::s1".into(),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                })
            }
        })
        .await;

        assert!(matches!(result, Err(CouchDaoError::RequestStatus { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    fn rows(value: serde_json::Value) -> Vec<BulkDocResult> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn bulk_write_with_only_ok_rows_succeeds() {
        let results = rows(serde_json::json!([
            {"ok": true, "id": "vote::bob::s1", "rev": "2-a"},
            {"ok": true, "id": "song::s1", "rev": "3-b"}
        ]));
        assert!(check_bulk_results(results).is_ok());
    }

    #[test]
    fn bulk_conflict_row_fails_the_write() {
        let results = rows(serde_json::json!([
            {"ok": true, "id": "vote::bob::s1", "rev": "2-a"},
            {"id": "song::s1", "error": "conflict", "reason": "Document update conflict."}
        ]));
        match check_bulk_results(results) {
            Err(CouchDaoError::Conflict { path }) => assert_eq!(path, "song::s1"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn bulk_forbidden_row_is_rejected() {
        let results = rows(serde_json::json!([
            {"id": "owner::u1", "error": "forbidden", "reason": "read only"}
        ]));
        match check_bulk_results(results) {
            Err(CouchDaoError::BulkRejected { id, error, reason }) => {
                assert_eq!(id, "owner::u1");
                assert_eq!(error, "forbidden");
                assert_eq!(reason.as_deref(), Some("read only"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
