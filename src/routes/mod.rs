use axum::{Router, http::StatusCode, routing::get};
use tower_http::services::ServeDir;

use crate::state::SharedState;

/// Admin login, reset and guarded pages.
pub mod admin;
/// Swagger UI and OpenAPI document.
pub mod docs;
/// Health check route.
pub mod health;
/// Registration and song submission routes.
pub mod players;
/// Voting round routes.
pub mod rounds;
/// Guess and results routes.
pub mod votes;

/// Compose all route trees, wiring in shared state, documentation and static pages.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(players::router())
        .merge(rounds::router())
        .merge(votes::router())
        .merge(admin::router(state.clone()))
        .merge(docs::router());

    // Explicit routes above win over files, so the guarded admin page cannot be fetched raw.
    let static_files = ServeDir::new(&state.config().static_dir);

    api_router
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .fallback_service(static_files)
        .with_state(state)
}
