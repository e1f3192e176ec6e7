//! User accounts, consumed by the pipeline to resolve roles.
//!
//! # Data Flow
//! ```text
//! signup / seed admin
//!     → password.rs (policy check, bcrypt hash)
//!     → store.rs (UserStore::insert)
//!
//! login
//!     → store.rs (find_by_email)
//!     → password.rs (verify)
//!     → security::session (issue token)
//! ```

pub mod password;
pub mod seed;
pub mod store;

use serde::{Deserialize, Serialize};

pub use store::{InMemoryUserStore, StoreError, UserStore};

/// Identifier of a stored user.
pub type UserId = u64;

/// Access role. Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Instructor => write!(f, "instructor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub email_verified: bool,
}

/// Fields needed to create a user; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub email_verified: bool,
}

/// Public view of a user, safe to return from the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            email_verified: user.email_verified,
        }
    }
}

/// Emails are compared case-insensitively and without surrounding space.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
