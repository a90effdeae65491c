/// Session policy
///
/// Decides, for each inbound request, whether the caller is logged in, needs
/// a renewed token pair, or has to authenticate again. No session table is
/// kept: every decision is a function of the request cookies, the signing
/// key and (for login only) one user-store lookup.

use actix_web::{web, HttpRequest, HttpResponseBuilder};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::claims::{TokenKind, UserIdentity};
use crate::auth::issuer::{CredentialPair, TokenIssuer};
use crate::auth::password::verify_password;
use crate::auth::transport::{CookieTransport, RawCredentials};
use crate::error::{AppError, AuthError};
use crate::store::UserStore;

/// Login request body. Both fields are required; a missing field fails
/// deserialization before any of the login flow runs.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// What the cookies on a request amount to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoCredentials,
    /// Access and refresh both verify; carries the access token's subject
    BothValid(UserIdentity),
    /// Access verifies, refresh is missing or invalid
    AccessValid(UserIdentity),
    /// Access is missing or invalid, refresh verifies; carries the refresh
    /// token's subject
    NeedsRenewal(UserIdentity),
    Invalid,
}

#[derive(Debug)]
pub enum LoginOutcome {
    /// Valid cookies were already present; nothing was issued
    AlreadyLoggedIn(UserIdentity),
    Authenticated {
        identity: UserIdentity,
        pair: CredentialPair,
    },
}

/// Result of the renewal policy on a protected route.
#[derive(Debug)]
pub struct Authenticated {
    pub identity: UserIdentity,
    /// Set when the access token had to be replaced
    pub renewed: Option<CredentialPair>,
}

pub struct SessionManager {
    issuer: TokenIssuer,
    transport: CookieTransport,
    store: Arc<dyn UserStore>,
}

impl SessionManager {
    pub fn new(issuer: TokenIssuer, transport: CookieTransport, store: Arc<dyn UserStore>) -> Self {
        Self {
            issuer,
            transport,
            store,
        }
    }

    pub fn transport(&self) -> &CookieTransport {
        &self.transport
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    fn verify_slot(&self, token: Option<&str>, kind: TokenKind) -> Option<UserIdentity> {
        let token = token?;
        match self.issuer.codec().decode_kind(token, kind) {
            Ok(claims) => Some(claims.identity()),
            Err(e) => {
                tracing::debug!(slot = %kind, reason = %e, "Session token rejected");
                None
            }
        }
    }

    pub fn inspect(&self, raw: &RawCredentials) -> SessionState {
        if raw.is_empty() {
            return SessionState::NoCredentials;
        }

        let access = self.verify_slot(raw.access.as_deref(), TokenKind::Access);
        let refresh = self.verify_slot(raw.refresh.as_deref(), TokenKind::Refresh);

        match (access, refresh) {
            (Some(identity), Some(_)) => SessionState::BothValid(identity),
            (Some(identity), None) => SessionState::AccessValid(identity),
            (None, Some(identity)) => SessionState::NeedsRenewal(identity),
            (None, None) => SessionState::Invalid,
        }
    }

    fn issue(&self, identity: &UserIdentity) -> Result<CredentialPair, AppError> {
        self.issuer
            .issue_pair(identity)
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Username/password login.
    ///
    /// A request that already carries a valid access and refresh token is
    /// answered from the access token alone, without touching the store.
    pub async fn login(
        &self,
        request: &HttpRequest,
        credentials: LoginRequest,
    ) -> Result<LoginOutcome, AppError> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(AuthError::BadCredentials.into());
        }

        let raw = self.transport.read(request);
        if raw.both_present() {
            if let SessionState::BothValid(identity) = self.inspect(&raw) {
                tracing::info!(uid = identity.uid, username = %identity.username, "User already logged in");
                return Ok(LoginOutcome::AlreadyLoggedIn(identity));
            }
        }

        // usernames are unique, so at most one record can match
        let user = self
            .store
            .find_by_username(&credentials.username)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        let hash = user.password_hash.clone();
        let password = credentials.password;
        let matches = match web::block(move || verify_password(&password, &hash)).await? {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!(uid = user.uid, error = %e, "Stored password hash is unusable");
                false
            }
        };
        if !matches {
            return Err(AuthError::BadCredentials.into());
        }

        let identity = user.identity();
        let pair = self.issue(&identity)?;

        tracing::info!(uid = identity.uid, username = %identity.username, "User logged in");
        Ok(LoginOutcome::Authenticated { identity, pair })
    }

    /// Renewal policy for protected routes: a valid access token is enough;
    /// otherwise a valid refresh token buys a new pair for its subject.
    pub fn authenticate(&self, request: &HttpRequest) -> Result<Authenticated, AppError> {
        match self.inspect(&self.transport.read(request)) {
            SessionState::BothValid(identity) | SessionState::AccessValid(identity) => {
                Ok(Authenticated {
                    identity,
                    renewed: None,
                })
            }
            SessionState::NeedsRenewal(identity) => {
                let pair = self.issue(&identity)?;
                tracing::info!(uid = identity.uid, username = %identity.username, "Session renewed");
                Ok(Authenticated {
                    identity,
                    renewed: Some(pair),
                })
            }
            SessionState::NoCredentials | SessionState::Invalid => {
                Err(AuthError::Unauthorized.into())
            }
        }
    }

    /// Drop both cookies. Always succeeds, with or without a session.
    pub fn logout(&self, response: &mut HttpResponseBuilder) {
        self.transport.clear(response);
    }
}
