/// JWT Token Encoding and Decoding
///
/// The codec is built once from `JwtSettings` and shared read-only by every
/// request handler. Expiry is checked with no clock-skew allowance: a token
/// whose `exp` equals the current second is already expired, and an expired
/// token is reported as `Expired` whether or not its signature verifies.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use std::fmt;

use crate::auth::claims::{Claims, TokenKind, UserIdentity};
use crate::configuration::JwtSettings;

/// Why a token was rejected. Only used for logs; callers outside the auth
/// module see a plain "unauthorized".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    InvalidSignature,
    Expired,
    WrongKind { expected: TokenKind, found: TokenKind },
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "token is malformed"),
            TokenError::InvalidSignature => write!(f, "token signature is invalid"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::WrongKind { expected, found } => {
                write!(f, "expected {} token, found {} token", expected, found)
            }
            TokenError::Signing(msg) => write!(f, "token signing failed: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

/// A signed token together with the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

/// The only claim read from a token whose signature did not verify.
#[derive(Deserialize)]
struct UnverifiedExpiry {
    exp: i64,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
        }
    }

    /// Sign a token for `subject` that expires `ttl` from now.
    pub fn encode(
        &self,
        subject: &UserIdentity,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<Credential, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims::new(subject, kind, now, ttl.num_seconds(), self.issuer.clone());

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| TokenError::Signing("expiry out of range".to_string()))?;

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(Credential {
            token,
            kind,
            expires_at,
        })
    }

    /// Verify a token and return its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        // expiry is checked below without leeway
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidIssuer => {
                    if self.is_past_expiry(token) {
                        TokenError::Expired
                    } else {
                        TokenError::InvalidSignature
                    }
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if claims.is_expired() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Read `exp` from a token that failed verification. Only the expiry
    /// decision leaves this function, never the payload.
    fn is_past_expiry(&self, token: &str) -> bool {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.leeway = 0;

        decode::<UnverifiedExpiry>(token, &self.decoding_key, &validation)
            .map(|data| Utc::now().timestamp() >= data.claims.exp)
            .unwrap_or(false)
    }

    /// Verify a token and require that it was issued for the `expected` slot.
    pub fn decode_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.decode(token)?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                found: claims.kind,
            });
        }
        Ok(claims)
    }
}
