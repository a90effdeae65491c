//! End-to-end tests for login, logout and session renewal

use async_trait::async_trait;
use chrono::Duration;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use petserver::auth::{hash_password, TokenCodec, TokenKind, UserIdentity};
use petserver::configuration::{ApplicationSettings, CookieSettings, JwtSettings, Settings};
use petserver::error::DatabaseError;
use petserver::startup::run;
use petserver::store::{InMemoryUserStore, NewUser, UserRecord, UserStore};

/// In-memory store that counts username lookups
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryUserStore,
    lookups: AtomicUsize,
}

#[async_trait]
impl UserStore for CountingStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_username(username).await
    }

    async fn find_by_id(&self, uid: i64) -> Result<Option<UserRecord>, DatabaseError> {
        self.inner.find_by_id(uid).await
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, DatabaseError> {
        self.inner.create(user).await
    }
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<CountingStore>,
    pub alice: UserIdentity,
    pub codec: TokenCodec,
    pub client: reqwest::Client,
}

impl TestApp {
    fn lookups(&self) -> usize {
        self.store.lookups.load(Ordering::SeqCst)
    }

    async fn login(&self, body: Value, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .post(&format!("{}/auth/login", &self.address))
            .json(&body);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.expect("Failed to execute request.")
    }

    async fn me(&self, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(&format!("{}/api/me", &self.address));
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.expect("Failed to execute request.")
    }

    async fn logout(&self, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.post(&format!("{}/auth/logout", &self.address));
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.expect("Failed to execute request.")
    }

    fn token(&self, kind: TokenKind, ttl: Duration) -> String {
        self.codec
            .encode(&self.alice, kind, ttl)
            .expect("Failed to encode token")
            .token
    }
}

fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-secret-key-at-least-32-chars".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "petserver-test".to_string(),
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(CountingStore::default());
    let alice = store
        .create(NewUser {
            username: "alice".to_string(),
            password_hash: hash_password("correct").expect("Failed to hash password"),
        })
        .await
        .expect("Failed to create user")
        .identity();

    let settings = Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port,
        },
        jwt: jwt_settings(),
        cookie: CookieSettings::default(),
        database: None,
    };

    let server = run(listener, store.clone(), settings)
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        alice,
        codec: TokenCodec::new(&jwt_settings()),
        client: reqwest::Client::new(),
    }
}

/// Set-Cookie headers keyed by cookie name, with the full header line as value
fn set_cookies(response: &reqwest::Response) -> HashMap<String, String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|line| {
            let name = line.split(';').next()?.split_once('=')?.0;
            Some((name.trim().to_string(), line.to_string()))
        })
        .collect()
}

fn cookie_value(line: &str) -> String {
    line.split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}

/// Builds a `Cookie` request header from a response's Set-Cookie lines
fn cookie_header(cookies: &HashMap<String, String>) -> String {
    format!(
        "access={}; refresh={}",
        cookie_value(&cookies["access"]),
        cookie_value(&cookies["refresh"])
    )
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_and_sets_both_cookies() {
    let app = spawn_app().await;

    let response = app
        .login(json!({"username": "alice", "password": "correct"}), None)
        .await;

    assert_eq!(200, response.status().as_u16());

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    for name in ["access", "refresh"] {
        let line = &cookies[name];
        assert!(!cookie_value(line).is_empty(), "{} cookie is empty", name);
        assert!(line.contains("HttpOnly"), "{} cookie is not HttpOnly", name);
        assert!(line.contains("Secure"), "{} cookie is not Secure", name);
        assert!(line.contains("Path=/"), "{} cookie has no path", name);
    }

    let access = app
        .codec
        .decode_kind(&cookie_value(&cookies["access"]), TokenKind::Access)
        .expect("access cookie is not a valid access token");
    let refresh = app
        .codec
        .decode_kind(&cookie_value(&cookies["refresh"]), TokenKind::Refresh)
        .expect("refresh cookie is not a valid refresh token");
    assert!(access.exp < refresh.exp);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["uid"], app.alice.uid);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(app.lookups(), 1);
}

#[tokio::test]
async fn login_returns_400_for_wrong_password() {
    let app = spawn_app().await;

    let response = app
        .login(json!({"username": "alice", "password": "wrong"}), None)
        .await;

    assert_eq!(400, response.status().as_u16());
    assert!(set_cookies(&response).is_empty(), "No tokens may be written");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 1);
    assert!(body.get("data").is_none());
    assert_eq!(app.lookups(), 1);
}

#[tokio::test]
async fn login_returns_401_for_unknown_user_with_same_message() {
    let app = spawn_app().await;

    let unknown = app
        .login(json!({"username": "mallory", "password": "correct"}), None)
        .await;
    assert_eq!(401, unknown.status().as_u16());
    let unknown: Value = unknown.json().await.unwrap();

    let wrong = app
        .login(json!({"username": "alice", "password": "wrong"}), None)
        .await;
    let wrong: Value = wrong.json().await.unwrap();

    assert_eq!(unknown["code"], 1);
    assert_eq!(unknown["msg"], wrong["msg"]);
}

#[tokio::test]
async fn login_returns_400_for_missing_or_empty_fields() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({"username": "alice"}), "missing password"),
        (json!({"password": "correct"}), "missing username"),
        (json!({}), "missing all fields"),
        (json!({"username": "", "password": "correct"}), "empty username"),
        (json!({"username": "alice", "password": ""}), "empty password"),
    ];

    for (body, reason) in test_cases {
        let response = app.login(body, None).await;

        assert_eq!(400, response.status().as_u16(),
            "Should reject request: {}", reason);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], 1, "Unexpected body for: {}", reason);
    }

    assert_eq!(app.lookups(), 0, "Invalid input must not reach the store");
}

#[tokio::test]
async fn login_with_valid_session_short_circuits() {
    let app = spawn_app().await;

    let first = app
        .login(json!({"username": "alice", "password": "correct"}), None)
        .await;
    let cookie = cookie_header(&set_cookies(&first));
    assert_eq!(app.lookups(), 1);

    let second = app
        .login(json!({"username": "alice", "password": "correct"}), Some(&cookie))
        .await;

    assert_eq!(302, second.status().as_u16());
    assert!(set_cookies(&second).is_empty(), "No new tokens may be issued");
    assert_eq!(app.lookups(), 1, "Store must not be consulted again");

    let body: Value = second.json().await.unwrap();
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["uid"], app.alice.uid);
    assert_eq!(body["data"]["username"], "alice");
}

#[tokio::test]
async fn login_with_expired_access_authenticates_again() {
    let app = spawn_app().await;
    let cookie = format!(
        "access={}; refresh={}",
        app.token(TokenKind::Access, Duration::seconds(-5)),
        app.token(TokenKind::Refresh, Duration::days(1)),
    );

    let response = app
        .login(json!({"username": "alice", "password": "correct"}), Some(&cookie))
        .await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(set_cookies(&response).len(), 2);
    assert_eq!(app.lookups(), 1);
}

// --- Protected Routes Tests ---

#[tokio::test]
async fn protected_route_accepts_valid_access_token() {
    let app = spawn_app().await;
    let cookie = format!("access={}", app.token(TokenKind::Access, Duration::minutes(5)));

    let response = app.me(Some(&cookie)).await;

    assert_eq!(200, response.status().as_u16());
    assert!(set_cookies(&response).is_empty());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["username"], "alice");
}

#[tokio::test]
async fn protected_route_renews_expired_access_token() {
    let app = spawn_app().await;
    let cookie = format!(
        "access={}; refresh={}",
        app.token(TokenKind::Access, Duration::seconds(-5)),
        app.token(TokenKind::Refresh, Duration::days(1)),
    );

    let response = app.me(Some(&cookie)).await;

    assert_eq!(200, response.status().as_u16());

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2, "A fresh pair should be written");
    let renewed = app
        .codec
        .decode_kind(&cookie_value(&cookies["access"]), TokenKind::Access)
        .expect("renewed access token should be valid");
    assert_eq!(renewed.identity(), app.alice);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["uid"], app.alice.uid);
    assert_eq!(app.lookups(), 0, "Renewal needs no password or store lookup");

    // The renewed cookies work on their own
    let again = app.me(Some(&cookie_header(&cookies))).await;
    assert_eq!(200, again.status().as_u16());
    assert!(set_cookies(&again).is_empty());
}

#[tokio::test]
async fn protected_route_returns_401_without_usable_tokens() {
    let app = spawn_app().await;

    let expired = format!(
        "access={}; refresh={}",
        app.token(TokenKind::Access, Duration::seconds(-5)),
        app.token(TokenKind::Refresh, Duration::seconds(-5)),
    );
    let swapped = format!(
        "access={}; refresh={}",
        app.token(TokenKind::Refresh, Duration::days(1)),
        app.token(TokenKind::Access, Duration::minutes(5)),
    );
    let test_cases = vec![
        (None, "no cookies"),
        (Some(expired.as_str()), "both tokens expired"),
        (Some("access=garbage; refresh=garbage"), "malformed tokens"),
        (Some(swapped.as_str()), "tokens in the wrong slots"),
    ];

    for (cookie, reason) in test_cases {
        let response = app.me(cookie).await;

        assert_eq!(401, response.status().as_u16(),
            "Should reject request: {}", reason);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], 1);
        assert_eq!(body["msg"], "authentication required",
            "Decode failures must not be distinguishable: {}", reason);
    }
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_clears_both_cookies() {
    let app = spawn_app().await;
    let login = app
        .login(json!({"username": "alice", "password": "correct"}), None)
        .await;
    let cookie = cookie_header(&set_cookies(&login));

    let response = app.logout(Some(&cookie)).await;

    assert_eq!(200, response.status().as_u16());
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    for name in ["access", "refresh"] {
        assert_eq!(cookie_value(&cookies[name]), "");
        assert!(cookies[name].contains("Max-Age=0"));
    }

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"code": 0, "msg": "logout success", "data": {}}));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let app = spawn_app().await;

    let first = app.logout(None).await;
    let second = app.logout(None).await;

    assert_eq!(first.status(), second.status());
    assert_eq!(200, first.status().as_u16());

    let first_body: Value = first.json().await.unwrap();
    let second_body: Value = second.json().await.unwrap();
    assert_eq!(first_body, second_body);
}

#[tokio::test]
async fn logout_does_not_revoke_copied_tokens() {
    // Stateless tokens: a copy taken before logout stays valid until it expires.
    let app = spawn_app().await;
    let login = app
        .login(json!({"username": "alice", "password": "correct"}), None)
        .await;
    let cookie = cookie_header(&set_cookies(&login));

    app.logout(Some(&cookie)).await;

    let response = app.me(Some(&cookie)).await;
    assert_eq!(200, response.status().as_u16());
}
