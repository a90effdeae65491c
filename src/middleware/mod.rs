/// Middleware module
///
/// Session renewal for protected routes.

mod session_middleware;

pub use session_middleware::SessionMiddleware;
