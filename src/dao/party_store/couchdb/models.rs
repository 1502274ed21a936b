use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{RoundEntity, SongEntity, UserEntity, VoteEntity};

/// `user::<user id>`: the participant, addressable by id.
pub const USER_PREFIX: &str = "user::";
/// `name::<name key>`: claims a first name; its create is the uniqueness check.
pub const NAME_PREFIX: &str = "name::";
/// `song::<song id>`: the song, addressable by id.
pub const SONG_PREFIX: &str = "song::";
/// `owner::<user id>`: claims the owner's single song slot.
pub const OWNER_PREFIX: &str = "owner::";
/// `vote::<voter id>::<song id>`: one vote per voter and song.
pub const VOTE_PREFIX: &str = "vote::";
pub const ROUND_DOC_ID: &str = "round::current";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// A stored entity together with its CouchDB identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> CouchDocument<T> {
    pub fn fresh(id: String, body: T) -> Self {
        Self {
            id,
            rev: None,
            body,
        }
    }
}

/// Body of a claim document: the id of the record holding the claimed key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub holder: String,
}

/// Answer to a successful document write.
#[derive(Debug, Deserialize)]
pub struct WriteResponse {
    pub rev: String,
}

/// Identity of a stored document, enough to delete it.
#[derive(Debug, Deserialize)]
pub struct CouchDocRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev")]
    pub rev: String,
}

#[derive(Debug, Serialize)]
pub struct BulkDocs {
    pub docs: Vec<DeletedDocument>,
}

#[derive(Debug, Serialize)]
pub struct DeletedDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(rename = "_deleted")]
    pub deleted: bool,
}

impl From<CouchDocRef> for DeletedDocument {
    fn from(value: CouchDocRef) -> Self {
        Self {
            id: value.id,
            rev: value.rev,
            deleted: true,
        }
    }
}

/// Per-document outcome of a `_bulk_docs` request. The request itself succeeds even
/// when some rows carry an `error`.
#[derive(Debug, Deserialize)]
pub struct BulkDocResult {
    pub id: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

pub type CouchUserDocument = CouchDocument<UserEntity>;
pub type CouchSongDocument = CouchDocument<SongEntity>;
pub type CouchVoteDocument = CouchDocument<VoteEntity>;
pub type CouchRoundDocument = CouchDocument<RoundEntity>;
pub type CouchClaimDocument = CouchDocument<Claim>;

pub fn user_doc_id(user_id: &str) -> String {
    format!("{USER_PREFIX}{user_id}")
}

pub fn name_claim_id(user: &UserEntity) -> String {
    format!("{NAME_PREFIX}{}", user.name_key())
}

pub fn song_doc_id(song_id: &str) -> String {
    format!("{SONG_PREFIX}{song_id}")
}

pub fn owner_claim_id(song: &SongEntity) -> String {
    format!("{OWNER_PREFIX}{}", song.user_id)
}

pub fn vote_doc_id(vote: &VoteEntity) -> String {
    format!("{}{}", voter_vote_prefix(&vote.voter_user_id), vote.song_id)
}

/// Common prefix of every vote cast by `voter_user_id`.
pub fn voter_vote_prefix(voter_user_id: &str) -> String {
    format!("{VOTE_PREFIX}{voter_user_id}::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::SystemTime;

    fn song(id: &str, owner: &str) -> SongEntity {
        SongEntity {
            id: id.into(),
            user_id: owner.into(),
            title: "Title".into(),
            artist: "Artist".into(),
            audio_url: None,
            played: false,
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn name_claims_collide_regardless_of_case() {
        let lower = UserEntity::new("alice".into());
        let upper = UserEntity::new("ALICE".into());
        assert_ne!(user_doc_id(&lower.id), user_doc_id(&upper.id));
        assert_eq!(name_claim_id(&lower), name_claim_id(&upper));
    }

    #[test]
    fn songs_are_addressed_by_id_and_claimed_by_owner() {
        let first = song("s1", "u1");
        let second = song("s2", "u1");
        assert_eq!(song_doc_id(&first.id), "song::s1");
        assert_ne!(song_doc_id(&first.id), song_doc_id(&second.id));
        assert_eq!(owner_claim_id(&first), owner_claim_id(&second));
    }

    #[test]
    fn votes_group_under_their_voter() {
        let vote = VoteEntity {
            id: "v1".into(),
            voter_user_id: "bob".into(),
            song_id: "s1".into(),
            guessed_user_id: "alice".into(),
            is_correct: true,
            round_id: None,
            created_at: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(vote_doc_id(&vote), "vote::bob::s1");
        assert!(vote_doc_id(&vote).starts_with(&voter_vote_prefix("bob")));
        assert!(!vote_doc_id(&vote).starts_with(&voter_vote_prefix("bo")));
    }

    #[test]
    fn prefixes_do_not_overlap_in_key_ranges() {
        let names = format!("{NAME_PREFIX}alice");
        let range = USER_PREFIX.to_owned()..format!("{USER_PREFIX}{END_SUFFIX}");
        assert!(!range.contains(&names));
        let owners = format!("{OWNER_PREFIX}u1");
        let range = SONG_PREFIX.to_owned()..format!("{SONG_PREFIX}{END_SUFFIX}");
        assert!(!range.contains(&owners));
    }

    #[test]
    fn fresh_documents_omit_revision() {
        let song = song("s1", "u1");
        let doc = CouchDocument::fresh(song_doc_id(&song.id), song);
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["_id"], json!("song::s1"));
        assert!(value.get("_rev").is_none());
        assert_eq!(value["user_id"], json!("u1"));
        assert_eq!(value["played"], json!(false));
    }

    #[test]
    fn bulk_results_expose_row_errors() {
        let rows: Vec<BulkDocResult> = serde_json::from_value(json!([
            {"ok": true, "id": "song::s1", "rev": "2-a"},
            {"id": "song::s2", "error": "conflict", "reason": "Document update conflict."}
        ]))
        .unwrap();
        assert!(rows[0].error.is_none());
        assert_eq!(rows[1].error.as_deref(), Some("conflict"));
    }
}
