//! Internal helpers for input normalization.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so the engine enforces the same rules on every entry point.

use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

/// Trims `value` and rejects empty names.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Case-insensitive uniqueness key for category names.
pub(crate) fn category_name_key(name: &str) -> String {
    name.trim().nfc().collect::<String>().to_lowercase()
}

/// Trims and lowercases an email address.
pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = value.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(EngineError::InvalidEmail(format!("invalid email: {email}")));
    }
    Ok(email)
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_key_folds_case_and_composition() {
        // "é" precomposed vs "e" + combining acute.
        assert_eq!(category_name_key(" Café "), category_name_key("CAFE\u{301}"));
    }

    #[test]
    fn emails_are_lowercased_and_checked() {
        assert_eq!(normalize_email(" Alice@Example.ORG ").unwrap(), "alice@example.org");
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("  ").is_err());
    }
}
