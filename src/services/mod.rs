/// Admin login check and party reset.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Participant registration and song submission.
pub mod player_service;
/// Scoreboard and per-song tallies.
pub mod results_service;
/// Voting round lifecycle.
pub mod round_service;
/// Backend selection and one-way fallback at startup.
pub mod storage_bootstrap;
/// Guess recording.
pub mod vote_service;
