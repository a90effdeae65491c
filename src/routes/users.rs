/// User Routes
///
/// Account creation and lookup by id. Password hashes never leave the store.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{hash_password, UserIdentity};
use crate::error::{AppError, DatabaseError, ErrorContext, ValidationError};
use crate::response::ApiResponse;
use crate::store::{NewUser, UserRecord, UserStore};
use crate::validators::{is_valid_password, is_valid_username};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

/// Public view of a user
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UserResponse {
    pub uid: i64,
    pub username: String,
}

impl From<UserIdentity> for UserResponse {
    fn from(identity: UserIdentity) -> Self {
        Self {
            uid: identity.uid,
            username: identity.username,
        }
    }
}

impl From<UserRecord> for UserResponse {
    fn from(record: UserRecord) -> Self {
        Self {
            uid: record.uid,
            username: record.username,
        }
    }
}

/// POST /users
///
/// # Errors
/// - 400: username missing/invalid, password missing/too long
/// - 409: username already exists
pub async fn create_user(
    form: web::Json<CreateUserRequest>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let CreateUserRequest { username, password } = form.into_inner();
    let username = is_valid_username(&username)?;
    is_valid_password(&password)?;

    let context = ErrorContext::new("user_creation").with_username(username.as_str());

    if store.find_by_username(&username).await?.is_some() {
        return Err(DatabaseError::UniqueConstraintViolation(
            "username already exists".to_string(),
        )
        .into());
    }

    let password_hash = web::block(move || hash_password(&password)).await??;
    let user = store
        .create(NewUser {
            username,
            password_hash,
        })
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        uid = user.uid,
        "User created successfully"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::ok(UserResponse::from(user), "create user success")))
}

/// GET /api/users/{id}
///
/// An unknown id is not an error: it answers `data: {user: null}`.
pub async fn get_user(
    path: web::Path<String>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let uid = path
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidId("user id".to_string()))?;

    let response = match store.find_by_id(uid).await? {
        Some(user) => ApiResponse::ok(json!({ "user": UserResponse::from(user) }), "get user success"),
        None => ApiResponse::ok(json!({ "user": null }), "user not found"),
    };

    Ok(HttpResponse::Ok().json(response))
}
