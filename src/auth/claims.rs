/// JWT Claims structure
///
/// Represents the payload of a session token: the subject identity, which
/// slot the token belongs to, and the standard JWT claims (RFC 7519).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The subject carried inside every token. Never holds a password or hash.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub uid: i64,
    pub username: String,
}

impl UserIdentity {
    pub fn new(uid: i64, username: impl Into<String>) -> Self {
        Self {
            uid,
            username: username.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User ID
    pub uid: i64,
    pub username: String,
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Token id, the key a revocation denylist would use
    pub jti: String,
}

impl Claims {
    /// Create claims expiring `ttl_seconds` after `now`
    pub fn new(
        subject: &UserIdentity,
        kind: TokenKind,
        now: i64,
        ttl_seconds: i64,
        issuer: String,
    ) -> Self {
        Self {
            uid: subject.uid,
            username: subject.username.clone(),
            kind,
            exp: now.saturating_add(ttl_seconds),
            iat: now,
            iss: issuer,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity::new(self.uid, self.username.clone())
    }

    /// A token is expired from the second its `exp` is reached. No leeway.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }
}
