use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Admin login payload.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Admin passphrase. Numbers are accepted as well as strings.
    #[serde(default, deserialize_with = "code_as_string")]
    #[schema(value_type = Option<String>)]
    pub code: Option<String>,
}

/// Body shared by operations with nothing else to report.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    /// Always `true`.
    pub success: bool,
}

impl SuccessResponse {
    /// Successful outcome.
    pub fn ok() -> Self {
        Self { success: true }
    }
}

fn code_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(code)) => Some(code),
        Some(serde_json::Value::Number(code)) => Some(code.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_codes_are_read_as_text() {
        let request: LoginRequest = serde_json::from_str(r#"{"code": 13091996}"#).unwrap();
        assert_eq!(request.code.as_deref(), Some("13091996"));

        let request: LoginRequest = serde_json::from_str(r#"{"code": "abc"}"#).unwrap();
        assert_eq!(request.code.as_deref(), Some("abc"));

        let request: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(request.code.is_none());
    }
}
