// src/utils/validation.rs

use std::sync::LazyLock;

use regex::Regex;

/// Optional leading `+`, then 7 to 15 digits once separators are removed.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone regex is valid"));

/// Strips spaces, dashes, dots and parentheses, which people type freely.
fn compact_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

/// `validator` custom check for phone number fields.
pub fn validate_phone(phone: &str) -> Result<(), validator::ValidationError> {
    if !PHONE_RE.is_match(&compact_phone(phone)) {
        return Err(validator::ValidationError::new("invalid_phone")
            .with_message("Phone number must contain 7 to 15 digits".into()));
    }
    Ok(())
}

/// `validator` custom check rejecting names made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank")
            .with_message("Must contain more than whitespace".into()));
    }
    Ok(())
}

/// Digits-only form used as the identity of public quiz participants.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Drops repeated ids, keeping the first occurrence and the original order.
pub fn dedup_ids(ids: Vec<i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
