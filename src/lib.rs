//! Library crate for whose-song-back, exposing modules for the binaries and integration tests.

/// Runtime configuration from file and environment.
pub mod config;
/// Domain records and persistence backends.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Use cases behind the routes.
pub mod services;
/// Shared application state.
pub mod state;
