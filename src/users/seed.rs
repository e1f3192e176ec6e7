//! Seed administrator provisioning at startup.

use crate::config::AdminConfig;
use crate::users::password::{hash_password, password_policy_ok};
use crate::users::{NewUser, Role, StoreError, UserStore};

/// What [`ensure_seed_admin`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// No email/password configured.
    NotConfigured,
    /// Password fails policy; nothing was written.
    RejectedPassword,
    /// The account already existed as a verified admin.
    AlreadyAdmin,
    /// An existing account was promoted and marked verified.
    Promoted,
    Created,
}

/// Make sure the configured administrator exists, is an admin, and is verified.
pub async fn ensure_seed_admin(
    store: &dyn UserStore,
    admin: &AdminConfig,
    bcrypt_cost: u32,
) -> Result<SeedOutcome, StoreError> {
    let (Some(email), Some(password)) = (admin.email.as_deref(), admin.password.as_deref()) else {
        return Ok(SeedOutcome::NotConfigured);
    };
    if !password_policy_ok(password) {
        tracing::warn!("Seed admin not created: admin password fails password policy");
        return Ok(SeedOutcome::RejectedPassword);
    }

    if let Some(mut existing) = store.find_by_email(email).await? {
        if existing.role == Role::Admin && existing.email_verified {
            return Ok(SeedOutcome::AlreadyAdmin);
        }
        existing.role = Role::Admin;
        existing.email_verified = true;
        store.update(existing).await?;
        tracing::info!(email = %email, "Seed admin promoted");
        return Ok(SeedOutcome::Promoted);
    }

    let password_hash = hash_password(password, bcrypt_cost)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    store
        .insert(NewUser {
            email: email.to_string(),
            password_hash,
            role: Role::Admin,
            email_verified: true,
        })
        .await?;
    tracing::info!(email = %email, "Seed admin created");
    Ok(SeedOutcome::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::InMemoryUserStore;

    fn admin(email: &str, password: &str) -> AdminConfig {
        AdminConfig {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn creates_then_is_idempotent() {
        let store = InMemoryUserStore::new();
        let cfg = admin("root@example.com", "sup3rsecret");

        assert_eq!(ensure_seed_admin(&store, &cfg, 4).await.unwrap(), SeedOutcome::Created);
        assert_eq!(ensure_seed_admin(&store, &cfg, 4).await.unwrap(), SeedOutcome::AlreadyAdmin);

        let user = store.find_by_email("root@example.com").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(user.email_verified);
    }

    #[tokio::test]
    async fn promotes_existing_student() {
        let store = InMemoryUserStore::new();
        store
            .insert(NewUser {
                email: "root@example.com".into(),
                password_hash: "x".into(),
                role: Role::Student,
                email_verified: false,
            })
            .await
            .unwrap();

        let outcome = ensure_seed_admin(&store, &admin("root@example.com", "sup3rsecret"), 4)
            .await
            .unwrap();
        assert_eq!(outcome, SeedOutcome::Promoted);
        let user = store.find_by_email("root@example.com").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(user.email_verified);
    }

    #[tokio::test]
    async fn skips_weak_password_and_missing_config() {
        let store = InMemoryUserStore::new();
        assert_eq!(
            ensure_seed_admin(&store, &admin("root@example.com", "weak"), 4).await.unwrap(),
            SeedOutcome::RejectedPassword
        );
        assert_eq!(
            ensure_seed_admin(&store, &AdminConfig::default(), 4).await.unwrap(),
            SeedOutcome::NotConfigured
        );
        assert!(store.list().await.unwrap().is_empty());
    }
}
