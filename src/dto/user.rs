use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::UserEntity,
    dto::validation::{FIRST_NAME_MAX_CHARS, limit_chars, require_text},
};

/// Registration payload.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Display name; surrounding whitespace is trimmed.
    #[serde(default)]
    pub first_name: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = require_text("firstName", self.first_name.as_deref()) {
            errors.add("firstName", e);
        } else if let Some(ref name) = self.first_name {
            if let Err(e) = limit_chars("firstName", name, FIRST_NAME_MAX_CHARS) {
                errors.add("firstName", e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Public view of a participant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Identifier returned at registration.
    pub id: String,
    /// Display name.
    pub first_name: String,
}

impl From<UserEntity> for UserSummary {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            first_name: value.first_name,
        }
    }
}

/// Answer to a successful registration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    /// Always `true`.
    pub success: bool,
    /// The new participant.
    pub user: UserSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_or_long_names_are_rejected() {
        let blank = RegisterRequest {
            first_name: Some("  ".into()),
        };
        assert!(blank.validate().is_err());
        assert!(RegisterRequest::default().validate().is_err());

        let long = RegisterRequest {
            first_name: Some("x".repeat(65)),
        };
        assert!(long.validate().is_err());

        let ok = RegisterRequest {
            first_name: Some(" Alice ".into()),
        };
        assert!(ok.validate().is_ok());
    }
}
