//! Port interfaces for credential persistence and user provisioning
//!
//! These traits define the boundaries between the authentication logic
//! and infrastructure implementations.

use std::fmt;

use async_trait::async_trait;
use beacon_domain::{Credential, IdentityKind, Result};

/// Persistent storage for one credential record per identity kind.
///
/// Writes replace the whole record for an identity so readers never observe
/// a partially updated field group.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored record, or `None` if nothing was ever stored.
    async fn load(&self, kind: IdentityKind) -> Result<Option<Credential>>;

    /// Replace the stored record for `credential.kind`.
    async fn store(&self, credential: &Credential) -> Result<()>;

    /// Remove the stored record. Resetting an empty slot succeeds.
    async fn reset(&self, kind: IdentityKind) -> Result<()>;
}

/// A platform user to be created for the service identity.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Identity-module operations needed to provision the service user.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create the user and return its platform id.
    async fn create_user(&self, user: &NewUser) -> Result<i64>;

    /// Grant `role_id` to `user_id` in the configured project.
    async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<()>;
}
