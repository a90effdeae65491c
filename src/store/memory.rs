use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{NewUser, UserRecord, UserStore};
use crate::error::DatabaseError;

/// Process-local user store, used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Users>,
}

#[derive(Default)]
struct Users {
    next_uid: i64,
    by_id: HashMap<i64, UserRecord>,
}

fn poisoned<T>(_: T) -> DatabaseError {
    DatabaseError::UnexpectedError("user store lock poisoned".to_string())
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let users = self.inner.read().map_err(poisoned)?;
        Ok(users
            .by_id
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, uid: i64) -> Result<Option<UserRecord>, DatabaseError> {
        let users = self.inner.read().map_err(poisoned)?;
        Ok(users.by_id.get(&uid).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, DatabaseError> {
        let mut users = self.inner.write().map_err(poisoned)?;

        if users.by_id.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "username already exists".to_string(),
            ));
        }

        users.next_uid += 1;
        let record = UserRecord {
            uid: users.next_uid,
            username: user.username,
            password_hash: user.password_hash,
        };
        users.by_id.insert(record.uid, record.clone());

        Ok(record)
    }
}
