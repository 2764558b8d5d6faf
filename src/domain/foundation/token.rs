//! Opaque session tokens with constant-time verification.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Bearer token proving ownership of a negotiation session.
///
/// 64 hex characters (two UUIDv4s back to back), well above the 128-bit
/// entropy requirement. Comparison is constant-time so that verification
/// latency carries no information about the stored token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Issues a fresh random token.
    pub fn issue() -> Self {
        Self(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ))
    }

    /// Wraps an existing token string (for deserialized snapshots).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Constant-time comparison against a presented token.
    ///
    /// Length mismatch still performs a full comparison against self so
    /// the timing profile stays flat.
    pub fn matches(&self, presented: &str) -> bool {
        let ours = self.0.as_bytes();
        let theirs = presented.as_bytes();
        if ours.len() != theirs.len() {
            // Burn the same comparison cost, then fail.
            let _ = ours.ct_eq(ours);
            return false;
        }
        ours.ct_eq(theirs).into()
    }

    /// Exposes the token for inclusion in a response to its owner.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(REDACTED)")
    }
}
