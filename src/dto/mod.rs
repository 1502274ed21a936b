use axum::extract::FromRequest;

use crate::error::AppError;

/// Admin login payloads.
pub mod admin;
/// Health check payload.
pub mod health;
/// Scoreboard payloads.
pub mod results;
/// Voting round payloads.
pub mod round;
/// Song submission payloads.
pub mod song;
/// Registration payloads.
pub mod user;
/// Shared field validation helpers.
pub mod validation;
/// Guess payloads.
pub mod vote;

/// JSON body extractor whose rejections use the API error shape instead of axum's plain text.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
