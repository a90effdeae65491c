use actix_web::dev::Server;
use actix_web::error::JsonPayloadError;
use actix_web::{middleware::Logger, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{CookieTransport, SessionManager, TokenIssuer};
use crate::configuration::Settings;
use crate::error::{AppError, ConfigError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::SessionMiddleware;
use crate::routes::{create_user, current_user, get_user, health_check, login, logout};
use crate::store::UserStore;

fn invalid_input(e: ConfigError) -> std::io::Error {
    let err = AppError::from(e);
    tracing::error!(error = %err, "Refusing to start");
    std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
}

/// Malformed or incomplete JSON bodies get the same `{code: 1, msg}` shape
/// as every other failure.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(ValidationError::Deserialization(err.to_string())).into()
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    settings.validate().map_err(invalid_input)?;

    let transport = CookieTransport::new(settings.cookie.clone()).map_err(invalid_input)?;
    let sessions = web::Data::new(SessionManager::new(
        TokenIssuer::new(&settings.jwt),
        transport,
        store.clone(),
    ));
    let store: web::Data<dyn UserStore> = web::Data::from(store);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(sessions.clone())
            .app_data(store.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/users", web::post().to(create_user))
            .route("/auth/login", web::post().to(login))
            .route("/auth/logout", web::post().to(logout))

            // Protected routes (session renewal applies)
            .service(
                web::scope("/api")
                    .wrap(SessionMiddleware::new(sessions.clone()))
                    .route("/me", web::get().to(current_user))
                    .route("/users/{id}", web::get().to(get_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
