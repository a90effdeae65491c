/// Cookie transport for the session token pair
///
/// Tokens travel in two named cookies. Each cookie expires together with the
/// token it carries, is `HttpOnly`, and is `Secure` unless configured off for
/// plain-HTTP development.
///
/// Clearing the cookies is the only logout there is: a copy of a token taken
/// before logout stays valid until its own expiry.

use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder};
use chrono::{DateTime, Utc};

use crate::auth::issuer::CredentialPair;
use crate::auth::jwt::Credential;
use crate::auth::claims::TokenKind;
use crate::configuration::CookieSettings;
use crate::error::{AppError, ConfigError};

/// The raw token strings found on a request. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCredentials {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl RawCredentials {
    pub fn both_present(&self) -> bool {
        self.access.is_some() && self.refresh.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct CookieTransport {
    settings: CookieSettings,
    same_site: SameSite,
}

impl CookieTransport {
    pub fn new(settings: CookieSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let same_site = settings.same_site_policy()?;
        Ok(Self {
            settings,
            same_site,
        })
    }

    fn name(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.settings.access_name,
            TokenKind::Refresh => &self.settings.refresh_name,
        }
    }

    /// Read both slots. Empty cookie values count as absent.
    pub fn read(&self, request: &HttpRequest) -> RawCredentials {
        let slot = |kind: TokenKind| {
            request
                .cookie(self.name(kind))
                .map(|c| c.value().to_string())
                .filter(|v| !v.is_empty())
        };

        RawCredentials {
            access: slot(TokenKind::Access),
            refresh: slot(TokenKind::Refresh),
        }
    }

    fn cookie(&self, kind: TokenKind, value: String, expires_at: DateTime<Utc>) -> Cookie<'static> {
        let remaining = (expires_at - Utc::now()).num_seconds().max(0);

        let mut builder = Cookie::build(self.name(kind).to_string(), value)
            .path(self.settings.path.clone())
            .secure(self.settings.secure)
            .http_only(true)
            .same_site(self.same_site)
            .max_age(CookieDuration::seconds(remaining));

        if let Ok(at) = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
            builder = builder.expires(at);
        }
        if let Some(domain) = &self.settings.domain {
            builder = builder.domain(domain.clone());
        }

        builder.finish()
    }

    fn credential_cookie(&self, credential: &Credential) -> Cookie<'static> {
        self.cookie(credential.kind, credential.token.clone(), credential.expires_at)
    }

    /// Cookies carrying a freshly issued pair.
    pub fn cookies(&self, pair: &CredentialPair) -> [Cookie<'static>; 2] {
        [
            self.credential_cookie(&pair.access),
            self.credential_cookie(&pair.refresh),
        ]
    }

    /// Empty, already-expired cookies that overwrite both slots.
    pub fn removal_cookies(&self) -> [Cookie<'static>; 2] {
        let expired = DateTime::<Utc>::UNIX_EPOCH;
        [
            self.cookie(TokenKind::Access, String::new(), expired),
            self.cookie(TokenKind::Refresh, String::new(), expired),
        ]
    }

    pub fn write(&self, response: &mut HttpResponseBuilder, pair: &CredentialPair) {
        for cookie in self.cookies(pair) {
            response.cookie(cookie);
        }
    }

    pub fn clear(&self, response: &mut HttpResponseBuilder) {
        for cookie in self.removal_cookies() {
            response.cookie(cookie);
        }
    }

    /// Write a pair onto a response that has already been built, e.g. by a
    /// downstream handler.
    pub fn write_to<B>(
        &self,
        response: &mut HttpResponse<B>,
        pair: &CredentialPair,
    ) -> Result<(), AppError> {
        for cookie in self.cookies(pair) {
            response
                .add_cookie(&cookie)
                .map_err(|e| AppError::Internal(format!("Failed to set cookie: {}", e)))?;
        }
        Ok(())
    }
}
