use actix_web::cookie::SameSite;
use config::ConfigError;

use crate::error::ConfigError as SettingsError;

/// Upper bound on either token lifetime, in seconds (ten years)
pub const MAX_TOKEN_LIFETIME: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub cookie: CookieSettings,
    pub database: Option<DatabaseSettings>,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// JWT signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

impl JwtSettings {
    /// Reject settings that would break the access/refresh lifetime ordering
    /// or sign with an empty key.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.secret.trim().is_empty() {
            return Err(SettingsError::MissingRequired("jwt.secret".to_string()));
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(SettingsError::InvalidValue(
                "jwt token lifetimes must be positive".to_string(),
            ));
        }
        if self.access_token_expiry > MAX_TOKEN_LIFETIME
            || self.refresh_token_expiry > MAX_TOKEN_LIFETIME
        {
            return Err(SettingsError::InvalidValue(format!(
                "jwt token lifetimes must not exceed {} seconds",
                MAX_TOKEN_LIFETIME
            )));
        }
        if self.access_token_expiry >= self.refresh_token_expiry {
            return Err(SettingsError::InvalidValue(
                "jwt.access_token_expiry must be shorter than jwt.refresh_token_expiry".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where and how the two session cookies are stored on the client
#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CookieSettings {
    pub access_name: String,
    pub refresh_name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: String,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            access_name: "access".to_string(),
            refresh_name: "refresh".to_string(),
            path: "/".to_string(),
            domain: None,
            secure: true,
            same_site: "lax".to_string(),
        }
    }
}

impl CookieSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.access_name.is_empty() || self.refresh_name.is_empty() {
            return Err(SettingsError::MissingRequired("cookie names".to_string()));
        }
        if self.access_name == self.refresh_name {
            return Err(SettingsError::InvalidValue(
                "cookie.access_name and cookie.refresh_name must differ".to_string(),
            ));
        }
        self.same_site_policy().map(|_| ())
    }

    pub fn same_site_policy(&self) -> Result<SameSite, SettingsError> {
        match self.same_site.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(SettingsError::InvalidValue(format!(
                "unknown cookie.same_site: {}",
                other
            ))),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.jwt.validate()?;
        self.cookie.validate()
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_valid_jwt_settings() {
        assert!(jwt().validate().is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut config = jwt();
        config.secret = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_access_must_be_shorter_than_refresh() {
        let mut config = jwt();
        config.access_token_expiry = config.refresh_token_expiry;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_lifetime_rejected() {
        let mut config = jwt();
        config.refresh_token_expiry = i64::MAX;
        assert!(config.validate().is_err());

        config.refresh_token_expiry = MAX_TOKEN_LIFETIME;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cookie_defaults() {
        let cookie = CookieSettings::default();
        assert_eq!(cookie.access_name, "access");
        assert_eq!(cookie.refresh_name, "refresh");
        assert!(cookie.secure);
        assert!(cookie.validate().is_ok());
    }

    #[test]
    fn test_unknown_same_site_rejected() {
        let cookie = CookieSettings {
            same_site: "sometimes".to_string(),
            ..CookieSettings::default()
        };
        assert!(cookie.validate().is_err());
    }
}
