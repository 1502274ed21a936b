//! Admin passphrase checks and the bulk reset.

use tracing::{info, warn};

use crate::{dto::admin::LoginRequest, error::ServiceError, state::SharedState};

/// Name of the cookie carrying the admin passphrase.
pub const ADMIN_COOKIE: &str = "admin_code";

/// Whether `candidate` matches the configured admin passphrase.
pub fn is_admin_code(state: &SharedState, candidate: &str) -> bool {
    !candidate.is_empty() && candidate == state.config().admin_code
}

/// Check a login attempt, returning the code to store in the admin cookie.
pub fn login(state: &SharedState, request: LoginRequest) -> Result<String, ServiceError> {
    match request.code {
        Some(code) if is_admin_code(state, &code) => {
            info!("admin logged in");
            Ok(code)
        }
        _ => {
            warn!("rejected admin login attempt");
            Err(ServiceError::Unauthorized("invalid admin code".into()))
        }
    }
}

/// Wipe songs, votes and the round record. Participants stay registered.
pub async fn reset(state: &SharedState) -> Result<(), ServiceError> {
    state
        .run_round_transition(|| state.store().reset())
        .await?;
    info!("party reset: songs, votes and round cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, ManualClock},
    };
    use std::sync::Arc;

    fn state(code: &str) -> SharedState {
        let config = AppConfig {
            admin_code: code.into(),
            ..AppConfig::default()
        };
        AppState::in_memory(config, Arc::new(ManualClock::new(0)))
    }

    #[test]
    fn login_accepts_only_the_configured_code() {
        let state = state("s3cret");
        let ok = login(
            &state,
            LoginRequest {
                code: Some("s3cret".into()),
            },
        );
        assert_eq!(ok.unwrap(), "s3cret");

        for code in [Some("nope".to_owned()), Some(String::new()), None] {
            assert!(matches!(
                login(&state, LoginRequest { code }),
                Err(ServiceError::Unauthorized(_))
            ));
        }
    }
}
