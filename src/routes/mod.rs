mod auth;
mod health_check;
mod users;

pub use auth::{current_user, login, logout};
pub use health_check::health_check;
pub use users::{create_user, get_user, UserResponse};
