//! Password hashing and policy.

use bcrypt::{hash, verify, BcryptError};
use tokio::sync::OnceCell;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (bcrypt only reads 72 bytes).
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Check length bounds and require at least one letter and one digit.
pub fn password_policy_ok(password: &str) -> bool {
    (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&password.len())
        && password.chars().any(|c| c.is_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Hash a password with bcrypt on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(|e| BcryptError::Io(std::io::Error::other(e)))?
}

/// Verify a password against a bcrypt hash on the blocking pool.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, BcryptError> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| BcryptError::Io(std::io::Error::other(e)))?
}

/// Stand-in hash checked when a login names an unknown account, so the
/// miss costs one bcrypt verification like a hit does.
pub struct DummyHash {
    cost: u32,
    hash: OnceCell<String>,
}

impl DummyHash {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            hash: OnceCell::new(),
        }
    }

    /// Verify `password` against the stand-in. The hash is created on first use.
    pub async fn verify(&self, password: &str) -> Result<bool, BcryptError> {
        let hash = self
            .hash
            .get_or_try_init(|| hash_password("dummy-account-password-0", self.cost))
            .await?;
        verify_password(password, hash).await
    }

    pub fn is_initialized(&self) -> bool {
        self.hash.initialized()
    }
}
