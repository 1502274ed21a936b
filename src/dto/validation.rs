//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted first name, in characters.
pub const FIRST_NAME_MAX_CHARS: usize = 64;
/// Longest accepted song title or artist, in characters.
pub const SONG_TEXT_MAX_CHARS: usize = 200;
/// Longest accepted audio link, in characters.
pub const AUDIO_URL_MAX_CHARS: usize = 2048;

/// Rejects absent values and values made only of whitespace.
///
/// ```ignore
/// require_text("firstName", Some("Alice")) // Ok
/// require_text("firstName", Some("   "))   // Err
/// require_text("firstName", None)          // Err
/// ```
pub fn require_text(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(()),
        _ => {
            let mut err = ValidationError::new("required");
            err.message = Some(format!("{field} is required").into());
            Err(err)
        }
    }
}

/// Rejects values whose trimmed form is longer than `max` characters.
pub fn limit_chars(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len > max {
        let mut err = ValidationError::new("length");
        err.message = Some(format!("{field} must be at most {max} characters (got {len})").into());
        return Err(err);
    }
    Ok(())
}

/// Trimmed copy of an optional field; blank becomes `None`.
pub fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert!(require_text("title", Some("Africa")).is_ok());
        assert!(require_text("title", Some("  x ")).is_ok());
        assert!(require_text("title", Some("   ")).is_err());
        assert!(require_text("title", Some("")).is_err());
        assert!(require_text("title", None).is_err());
    }

    #[test]
    fn test_require_text_message_names_field() {
        let err = require_text("songId", None).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("songId is required"));
    }

    #[test]
    fn test_limit_chars_counts_characters() {
        assert!(limit_chars("firstName", &"é".repeat(64), 64).is_ok());
        assert!(limit_chars("firstName", &"a".repeat(65), 64).is_err());
        assert!(limit_chars("firstName", "  padded  ", 6).is_ok());
    }

    #[test]
    fn test_trimmed() {
        assert_eq!(trimmed(Some("  a b ")), Some("a b".to_owned()));
        assert_eq!(trimmed(Some("   ")), None);
        assert_eq!(trimmed(None), None);
    }
}
