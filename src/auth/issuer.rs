/// Access/refresh token pair issuance
///
/// Both tokens of a pair carry the same subject. The access token lives for
/// `access_token_expiry` seconds, the refresh token for `refresh_token_expiry`;
/// `JwtSettings::validate` guarantees the first is shorter.

use chrono::Duration;

use crate::auth::claims::{TokenKind, UserIdentity};
use crate::auth::jwt::{Credential, TokenCodec, TokenError};
use crate::configuration::{JwtSettings, MAX_TOKEN_LIFETIME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: Credential,
    pub refresh: Credential,
}

#[derive(Clone)]
pub struct TokenIssuer {
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

fn lifetime(seconds: i64) -> Duration {
    Duration::seconds(seconds.clamp(0, MAX_TOKEN_LIFETIME))
}

impl TokenIssuer {
    /// Lifetimes outside `0..=MAX_TOKEN_LIFETIME` are clamped;
    /// `JwtSettings::validate` rejects them before startup.
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            codec: TokenCodec::new(config),
            access_ttl: lifetime(config.access_token_expiry),
            refresh_ttl: lifetime(config.refresh_token_expiry),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn issue_pair(&self, identity: &UserIdentity) -> Result<CredentialPair, TokenError> {
        let access = self.codec.encode(identity, TokenKind::Access, self.access_ttl)?;
        let refresh = self.codec.encode(identity, TokenKind::Refresh, self.refresh_ttl)?;

        debug_assert!(access.expires_at < refresh.expires_at);

        Ok(CredentialPair { access, refresh })
    }
}
