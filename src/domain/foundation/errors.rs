//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        actual: f64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: f64, max: f64, actual: f64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error kinds surfaced to callers, organized by category.
///
/// These map one-to-one onto the wire-level error codes; the HTTP adapter
/// owns the status-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed request payload (bad price, bad id format, bad language).
    BadInput,
    /// Session token missing or wrong. Also returned for unknown session
    /// ids so that callers cannot probe for session existence.
    BadToken,
    /// Referenced resource does not exist.
    NoSession,
    /// Session already reached a terminal state.
    SessionClosed,
    /// Another request holds the per-session lock.
    Busy,
    /// Stale retry for a round that has already advanced.
    OutOfOrder,
    /// Per-session cooldown window has not elapsed.
    Cooldown,
    /// Per-IP start rate limit exceeded.
    RateLimited,
    /// Price failed the deterministic validation gate.
    ValidationFailed,
    /// Dialogue generation failed and the deterministic fallback failed too.
    DialogueFailed,
    /// A storage tier is unavailable; the session may be serviceable but
    /// the audit trail is incomplete.
    Degraded,
    /// Unexpected internal failure; details live in structured logs only.
    Internal,
}

impl ErrorKind {
    /// Wire-level error code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::BadInput => "bad_input",
            ErrorKind::BadToken => "bad_token",
            ErrorKind::NoSession => "no_session",
            ErrorKind::SessionClosed => "session_closed",
            ErrorKind::Busy => "busy",
            ErrorKind::OutOfOrder => "out_of_order",
            ErrorKind::Cooldown => "cooldown",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::DialogueFailed => "dialogue_failed",
            ErrorKind::Degraded => "degraded",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Standard domain error with kind, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a bad input error.
    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadInput, message)
    }

    /// Creates a bad token error. The message is deliberately generic so
    /// that the response shape does not depend on why verification failed.
    pub fn bad_token() -> Self {
        Self::new(ErrorKind::BadToken, "Invalid session token")
    }

    /// Creates a session closed error.
    pub fn session_closed(state: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionClosed, "Session is closed")
            .with_detail("state", state.into())
    }

    /// Creates a busy error (lock contention).
    pub fn busy() -> Self {
        Self::new(ErrorKind::Busy, "Session is being processed, try again")
    }

    /// Creates an out-of-order retry error.
    pub fn out_of_order(expected: u32) -> Self {
        Self::new(ErrorKind::OutOfOrder, "Round has already advanced")
            .with_detail("expected_round", expected.to_string())
    }

    /// Creates a cooldown error.
    pub fn cooldown() -> Self {
        Self::new(ErrorKind::Cooldown, "Please wait before making another offer")
    }

    /// Creates a rate limited error.
    pub fn rate_limited() -> Self {
        Self::new(ErrorKind::RateLimited, "Rate limit exceeded, try again later")
    }

    /// Creates a degraded-storage error.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Degraded, message)
    }

    /// Creates an internal error with an opaque public message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        DomainError::bad_input(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_codes_are_snake_case() {
        assert_eq!(ErrorKind::BadInput.code(), "bad_input");
        assert_eq!(ErrorKind::SessionClosed.code(), "session_closed");
        assert_eq!(ErrorKind::OutOfOrder.code(), "out_of_order");
        assert_eq!(ErrorKind::DialogueFailed.code(), "dialogue_failed");
    }

    #[test]
    fn domain_error_displays_kind_and_message() {
        let err = DomainError::busy();
        assert_eq!(
            format!("{}", err),
            "[busy] Session is being processed, try again"
        );
    }

    #[test]
    fn domain_error_with_detail_adds_detail() {
        let err = DomainError::out_of_order(7);
        assert_eq!(err.details.get("expected_round"), Some(&"7".to_string()));
    }

    #[test]
    fn bad_token_message_is_generic() {
        // The bad-token response must not vary with the failure cause.
        assert_eq!(DomainError::bad_token().message, "Invalid session token");
        assert!(DomainError::bad_token().details.is_empty());
    }

    #[test]
    fn validation_error_converts_to_bad_input() {
        let err: DomainError = ValidationError::empty_field("product_id").into();
        assert_eq!(err.kind, ErrorKind::BadInput);
    }
}
