use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{
        HeaderMap, Request, StatusCode,
        header::{ACCEPT, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tracing::{debug, warn};

use crate::{
    dto::{
        ApiJson,
        admin::{LoginRequest, SuccessResponse},
    },
    error::{AppError, ErrorBody},
    services::admin_service::{self, ADMIN_COOKIE},
    state::SharedState,
};

const LOGIN_PAGE: &str = "/admin-login.html";
const ADMIN_PAGE_FILE: &str = "admin.html";
/// Served when the static directory ships no admin page.
const BUILTIN_ADMIN_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8" /><title>Admin</title><link rel="stylesheet" href="/styles.css" /></head>
<body>
<h1>Administration</h1>
<p>Songs, rounds and results are available through the <a href="/docs">API</a>.</p>
<script src="/scripts/admin.js"></script>
</body>
</html>
"#;

/// Admin login plus the endpoints and pages guarded by the admin cookie.
pub fn router(state: SharedState) -> Router<SharedState> {
    let guarded = Router::new()
        .route("/api/reset", post(reset))
        .route("/admin", get(admin_page))
        .route("/admin.html", get(admin_page))
        .route("/api/admin", get(admin_page))
        .route("/api/admin.html", get(admin_page))
        .route_layer(middleware::from_fn_with_state(state, require_admin_cookie));

    Router::new()
        .route("/api/admin/login", post(login))
        .merge(guarded)
}

/// Exchange the admin passphrase for the admin cookie.
#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "admin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; `admin_code` cookie set", body = SuccessResponse),
        (status = 401, description = "Wrong passphrase", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    let code = admin_service::login(&state, payload)?;
    let cookie = format!("{ADMIN_COOKIE}={code}; Path=/; HttpOnly; SameSite=Lax");
    Ok(([(SET_COOKIE, cookie)], Json(SuccessResponse::ok())).into_response())
}

/// Delete every song, vote and the current round. Participants are kept.
#[utoipa::path(
    post,
    path = "/api/reset",
    tag = "admin",
    params(("admin_code" = String, Cookie, description = "Admin passphrase set by /api/admin/login")),
    responses(
        (status = 200, description = "Party reset", body = SuccessResponse),
        (status = 401, description = "Missing or wrong admin cookie", body = ErrorBody)
    )
)]
pub async fn reset(State(state): State<SharedState>) -> Result<Json<SuccessResponse>, AppError> {
    admin_service::reset(&state).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn admin_page(State(state): State<SharedState>) -> Response {
    let path = state.config().static_dir.join(ADMIN_PAGE_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "serving built-in admin page");
            (
                [(CONTENT_TYPE, "text/html; charset=utf-8")],
                BUILTIN_ADMIN_PAGE,
            )
                .into_response()
        }
    }
}

async fn require_admin_cookie(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let authorized = cookie_value(req.headers(), ADMIN_COOKIE)
        .is_some_and(|code| admin_service::is_admin_code(&state, code));
    if authorized {
        return Ok(next.run(req).await);
    }

    warn!(path = %req.uri().path(), "rejected request without a valid admin cookie");
    if wants_html(req.headers()) {
        Err((StatusCode::FOUND, [(LOCATION, LOGIN_PAGE)]).into_response())
    } else {
        Err(AppError::Unauthorized("admin authentication required".into()).into_response())
    }
}

/// Value of cookie `name` from the `Cookie` request headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

/// Browsers navigating to a page list `text/html`; API clients do not.
fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| {
            accept
                .split(',')
                .any(|media| media.trim().starts_with("text/html"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; admin_code=13091996 ;x=1"),
        );
        assert_eq!(cookie_value(&headers, ADMIN_COOKIE), Some("13091996"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn only_explicit_html_accept_redirects() {
        let mut headers = HeaderMap::new();
        assert!(!wants_html(&headers));

        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        assert!(!wants_html(&headers));

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9"),
        );
        assert!(wants_html(&headers));
    }
}
