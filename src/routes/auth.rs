/// Session Routes
///
/// Login, logout and the current-user lookup.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::auth::{LoginOutcome, LoginRequest, SessionManager, UserIdentity};
use crate::error::{AppError, ErrorContext};
use crate::response::ApiResponse;
use crate::routes::UserResponse;

/// POST /auth/login
///
/// Authenticate with username and password and set the access/refresh cookies.
///
/// # Responses
/// - 200: new session, `data: {uid, username}`
/// - 302: the request already carried a valid session; nothing is issued
/// - 400: missing/empty fields or wrong password
/// - 401: unknown username (same message as a wrong password)
pub async fn login(
    request: HttpRequest,
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login").with_username(form.username.as_str());

    match sessions.login(&request, form.into_inner()).await {
        Ok(LoginOutcome::AlreadyLoggedIn(identity)) => Ok(HttpResponse::Found().json(
            ApiResponse::ok(
                UserResponse::from(identity),
                "user is already logged in and has a valid token",
            ),
        )),
        Ok(LoginOutcome::Authenticated { identity, pair }) => {
            tracing::info!(
                request_id = %context.request_id,
                uid = identity.uid,
                "Session cookies issued"
            );

            let mut response = HttpResponse::Ok();
            sessions.transport().write(&mut response, &pair);
            Ok(response.json(ApiResponse::ok(UserResponse::from(identity), "login success")))
        }
        Err(e) => {
            context.log_error(&e);
            Err(e)
        }
    }
}

/// POST /auth/logout
///
/// Clears both cookies. Tokens are stateless, so a copy kept elsewhere stays
/// usable until it expires. Succeeds with or without a session.
pub async fn logout(sessions: web::Data<SessionManager>) -> HttpResponse {
    let mut response = HttpResponse::Ok();
    sessions.logout(&mut response);
    response.json(ApiResponse::ok(json!({}), "logout success"))
}

/// GET /api/me
///
/// **Requires a session**; the identity is injected by `SessionMiddleware`.
pub async fn current_user(identity: web::ReqData<UserIdentity>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(
        UserResponse::from(identity.into_inner()),
        "get current user success",
    ))
}
