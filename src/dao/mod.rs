/// Domain records and identifier helpers.
pub mod models;
/// Persistence backends for participants, songs, votes and rounds.
pub mod party_store;
/// Errors shared by every backend.
pub mod storage;
