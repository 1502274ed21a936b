use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the party game API.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::players::register,
        crate::routes::players::list_users,
        crate::routes::players::submit_song,
        crate::routes::players::list_songs,
        crate::routes::rounds::start_vote,
        crate::routes::rounds::active_vote,
        crate::routes::rounds::stop_vote,
        crate::routes::votes::vote,
        crate::routes::votes::results,
        crate::routes::admin::login,
        crate::routes::admin::reset,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::dto::health::HealthResponse,
            crate::dto::user::RegisterRequest,
            crate::dto::user::RegisterResponse,
            crate::dto::user::UserSummary,
            crate::dto::song::SubmitSongRequest,
            crate::dto::song::SubmitSongResponse,
            crate::dto::song::SongView,
            crate::dto::round::StartRoundRequest,
            crate::dto::round::StartRoundResponse,
            crate::dto::round::RoundSession,
            crate::dto::round::ActiveRoundResponse,
            crate::dto::round::RoundSong,
            crate::dto::vote::VoteRequest,
            crate::dto::vote::VoteResponse,
            crate::dto::vote::VoteView,
            crate::dto::results::ResultsResponse,
            crate::dto::results::SongResult,
            crate::dto::results::ResolvedVote,
            crate::dto::results::ScoreEntry,
            crate::dto::admin::LoginRequest,
            crate::dto::admin::SuccessResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "players", description = "Registration and song submission"),
        (name = "rounds", description = "Timed voting rounds"),
        (name = "votes", description = "Guesses and results"),
        (name = "admin", description = "Passphrase-protected administration"),
    )
)]
/// OpenAPI document of every HTTP route.
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_api_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/api/register",
            "/api/users",
            "/api/submit-song",
            "/api/songs",
            "/api/start-vote",
            "/api/active-vote",
            "/api/stop-vote",
            "/api/vote",
            "/api/results",
            "/api/admin/login",
            "/api/reset",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
