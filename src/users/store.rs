//! User storage collaborator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use crate::users::{normalize_email, NewUser, User, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email {0} is already registered")]
    DuplicateEmail(String),
    #[error("user {0} not found")]
    NotFound(UserId),
    #[error("user store unavailable: {0}")]
    Backend(String),
}

/// Lookup and mutation of user accounts.
///
/// Implementations may perform I/O; callers await every operation.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    async fn update(&self, user: User) -> Result<(), StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

/// Process-local store backed by concurrent maps.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<UserId, User>>,
    by_email: Arc<DashMap<String, UserId>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        Ok(self
            .by_email
            .get(&email)
            .and_then(|id| self.users.get(id.value()).map(|r| r.value().clone())))
    }

    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let email = normalize_email(&new.email);
        // The email index entry is held locked until the user row exists.
        match self.by_email.entry(email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail(email)),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                let user = User {
                    id,
                    email,
                    password_hash: new.password_hash,
                    role: new.role,
                    email_verified: new.email_verified,
                };
                self.users.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }

    async fn update(&self, user: User) -> Result<(), StoreError> {
        match self.users.get_mut(&user.id) {
            Some(mut existing) => {
                if existing.email != user.email {
                    return Err(StoreError::Backend("email changes are not supported".into()));
                }
                *existing = user;
                Ok(())
            }
            None => Err(StoreError::NotFound(user.id)),
        }
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|r| r.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Student,
            email_verified: false,
        }
    }

    #[tokio::test]
    async fn insert_and_lookup() {
        let store = InMemoryUserStore::new();
        let user = store.insert(new_user("Ada@Example.com ")).await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "ada@example.com");

        let found = store.find_by_email("ADA@example.com").await.unwrap().unwrap();
        assert_eq!(found, user);
        assert_eq!(store.find_by_id(1).await.unwrap(), Some(user));
        assert!(store.find_by_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@example.com")).await.unwrap();
        let err = store.insert(new_user("A@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_role() {
        let store = InMemoryUserStore::new();
        let mut user = store.insert(new_user("a@example.com")).await.unwrap();
        user.role = Role::Admin;
        store.update(user.clone()).await.unwrap();
        assert_eq!(store.find_by_id(user.id).await.unwrap().unwrap().role, Role::Admin);

        user.id = 99;
        assert!(matches!(store.update(user).await, Err(StoreError::NotFound(99))));
    }
}
