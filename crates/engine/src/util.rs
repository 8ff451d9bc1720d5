//! Internal helpers for input normalization and id parsing.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every operation enforces the same rules.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Trim a required name and reject it when empty.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional free text, mapping blank strings to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Apply a text patch: `None` keeps the current value, `Some("")` clears it.
pub(crate) fn apply_optional_text_patch(
    existing: Option<String>,
    patch: Option<&str>,
) -> Option<String> {
    match patch {
        None => existing,
        Some(value) => normalize_optional_text(Some(value)),
    }
}

/// Uniqueness key for user-visible names (project codes, party names).
///
/// NFKC + lowercase, with inner whitespace collapsed, so `"ACME  Srl"` and
/// `"acme srl"` collide.
pub(crate) fn normalize_key(value: &str) -> String {
    value
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Minimal shape check for contact emails.
pub(crate) fn validate_email(value: Option<&str>) -> ResultEngine<()> {
    if let Some(email) = value
        && !email.trim().is_empty()
    {
        let email = email.trim();
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Err(EngineError::InvalidInput(format!("invalid email: {email}")));
        }
    }
    Ok(())
}
