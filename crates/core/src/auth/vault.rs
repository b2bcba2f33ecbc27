//! In-memory credential cache in front of a [`CredentialStore`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beacon_domain::{BeaconError, Credential, IdentityKind, Result, TokenGrant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use super::ports::CredentialStore;

/// Owns the three identity slots.
///
/// Each slot is loaded from the store on first access and guarded by its
/// own lock. The lock is held across the store write, so a reader sees
/// either the old field group or the new one, never a mix.
pub struct CredentialVault {
    store: Arc<dyn CredentialStore>,
    slots: [RwLock<Option<Credential>>; 3],
    interactive_login_active: AtomicBool,
}

impl CredentialVault {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            slots: [RwLock::new(None), RwLock::new(None), RwLock::new(None)],
            interactive_login_active: AtomicBool::new(false),
        }
    }

    const fn slot_index(kind: IdentityKind) -> usize {
        match kind {
            IdentityKind::Application => 0,
            IdentityKind::ServiceUser => 1,
            IdentityKind::InteractiveUser => 2,
        }
    }

    fn slot(&self, kind: IdentityKind) -> &RwLock<Option<Credential>> {
        &self.slots[Self::slot_index(kind)]
    }

    async fn load_from_store(&self, kind: IdentityKind) -> Result<Credential> {
        let loaded = self.store.load(kind).await?;
        debug!(identity = %kind, found = loaded.is_some(), "Loaded credential slot");
        Ok(loaded.filter(|c| c.kind == kind).unwrap_or_else(|| Credential::empty(kind)))
    }

    /// Snapshot of the credential for `kind`.
    pub async fn get(&self, kind: IdentityKind) -> Result<Credential> {
        if let Some(credential) = self.slot(kind).read().await.as_ref() {
            return Ok(credential.clone());
        }

        let mut guard = self.slot(kind).write().await;
        if let Some(credential) = guard.as_ref() {
            return Ok(credential.clone());
        }
        let credential = self.load_from_store(kind).await?;
        *guard = Some(credential.clone());
        Ok(credential)
    }

    pub async fn is_authenticated(&self, kind: IdentityKind) -> Result<bool> {
        Ok(self.get(kind).await?.is_authenticated())
    }

    /// Apply `change` to the slot and persist the result as one write.
    ///
    /// The in-memory slot is only replaced once the store accepted the
    /// record.
    async fn update<F>(&self, kind: IdentityKind, change: F) -> Result<Credential>
    where
        F: FnOnce(&mut Credential) + Send,
    {
        let mut guard = self.slot(kind).write().await;
        let mut next = match guard.as_ref() {
            Some(current) => current.clone(),
            None => self.load_from_store(kind).await?,
        };
        change(&mut next);

        let checked = next.check_storable();
        debug_assert!(checked.is_ok(), "refusing to store malformed credential: {checked:?}");
        if let Err(err) = checked {
            error!(identity = %kind, error = %err, "Refusing to store malformed credential");
            return Err(err);
        }

        self.store.store(&next.persisted_form()).await?;
        *guard = Some(next.clone());
        Ok(next)
    }

    /// Store the tokens from a successful grant.
    #[instrument(skip(self, grant), fields(identity = %kind))]
    pub async fn apply_grant(&self, kind: IdentityKind, grant: &TokenGrant) -> Result<Credential> {
        self.update(kind, |credential| credential.apply_grant(grant)).await
    }

    /// Replace the username and password of a user identity.
    ///
    /// A different username (compared case-insensitively) invalidates the
    /// stored tokens. The platform user id is always cleared.
    ///
    /// # Errors
    /// Returns `BeaconError::Internal` for the application identity, which
    /// has no user credentials.
    #[instrument(skip(self, password), fields(identity = %kind))]
    pub async fn update_credentials(
        &self,
        kind: IdentityKind,
        username: &str,
        password: &str,
    ) -> Result<()> {
        if !kind.is_user() {
            return Err(BeaconError::Internal(format!("{kind} identity has no user credentials")));
        }

        self.update(kind, |credential| {
            let same_user = credential
                .username
                .as_deref()
                .is_some_and(|current| current.eq_ignore_ascii_case(username));
            if !same_user {
                debug!("Username changed, dropping tokens");
                credential.clear_tokens();
            }
            credential.clear_password();
            credential.username = Some(username.to_owned());
            credential.password = Some(password.to_owned());
            credential.user_id = None;
        })
        .await?;

        Ok(())
    }

    /// Drop the in-memory password. The stored record is not touched.
    pub async fn clear_password(&self, kind: IdentityKind) {
        if let Some(credential) = self.slot(kind).write().await.as_mut() {
            credential.clear_password();
        }
    }

    pub async fn set_user_id(&self, kind: IdentityKind, user_id: i64) -> Result<()> {
        self.update(kind, |credential| credential.user_id = Some(user_id)).await?;
        Ok(())
    }

    /// Clear every field of the slot, in storage and in memory.
    #[instrument(skip(self), fields(identity = %kind))]
    pub async fn reset(&self, kind: IdentityKind) -> Result<()> {
        let mut guard = self.slot(kind).write().await;
        self.store.reset(kind).await?;
        if let Some(mut previous) = guard.replace(Credential::empty(kind)) {
            previous.clear_password();
        }
        info!("Credential reset");
        Ok(())
    }

    pub fn set_interactive_login(&self, active: bool) {
        self.interactive_login_active.store(active, Ordering::SeqCst);
    }

    pub fn interactive_login_active(&self) -> bool {
        self.interactive_login_active.load(Ordering::SeqCst)
    }

    /// The user identity requests should run as: the interactive user while
    /// a developer login is active, otherwise the service user.
    pub fn preferred_user_identity(&self) -> IdentityKind {
        if self.interactive_login_active() {
            IdentityKind::InteractiveUser
        } else {
            IdentityKind::ServiceUser
        }
    }
}
