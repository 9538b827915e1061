//! User persistence.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::users::types::{NewUser, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save(&self, user: NewUser) -> User;
    async fn find_by_id(&self, id: i64) -> Option<User>;
}

#[derive(Debug)]
pub struct InMemoryUserRepository {
    next_id: AtomicI64,
    rows: DashMap<i64, User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            rows: DashMap::new(),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: NewUser) -> User {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let saved = User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            department_id: user.department_id,
        };
        self.rows.insert(id, saved.clone());
        saved
    }

    async fn find_by_id(&self, id: i64) -> Option<User> {
        self.rows.get(&id).map(|row| row.value().clone())
    }
}
