//! Failure classification by engine error text.
//!
//! External engines only report free text. The keyword lists below are the
//! single place where that text is mapped onto [`HandlerError`].

use super::HandlerError;

const ENCRYPTED_KEYWORDS: &[&str] = &[
    "password",
    "protected",
    "access",
    "permission",
    "encrypted",
    "locked",
];

const MISSING_KEYWORDS: &[&str] = &[
    "class not registered",
    "80040154",
    "not installed",
    "cannot create activex",
    "invalid class string",
];

/// Classify an engine's error message.
///
/// Password and access related text becomes [`HandlerError::Encrypted`],
/// COM registration failures become [`HandlerError::MissingDependency`],
/// anything else is [`HandlerError::Corrupted`].
pub fn classify_failure(message: &str) -> HandlerError {
    let lower = message.to_lowercase();
    let detail = message.trim().to_string();

    if ENCRYPTED_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return HandlerError::Encrypted { reason: detail };
    }

    if MISSING_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return HandlerError::MissingDependency { dependency: detail };
    }

    HandlerError::Corrupted { reason: detail }
}
