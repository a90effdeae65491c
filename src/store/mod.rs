/// User store
///
/// The session core only reads users through this trait. Records are
/// created by the create-user endpoint; nothing in the auth flow writes.

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;

use crate::auth::UserIdentity;
use crate::error::DatabaseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub uid: i64,
    pub username: String,
    pub password_hash: String,
}

impl UserRecord {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity::new(self.uid, self.username.clone())
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError>;

    async fn find_by_id(&self, uid: i64) -> Result<Option<UserRecord>, DatabaseError>;

    /// Fails with `UniqueConstraintViolation` when the username is taken.
    async fn create(&self, user: NewUser) -> Result<UserRecord, DatabaseError>;
}
