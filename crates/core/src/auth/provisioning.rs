//! Silent creation of the per-installation service user.

use beacon_domain::constants::{GENERATED_PASSWORD_GROUP_LEN, SERVICE_USER_CREATION_ATTEMPTS};
use beacon_domain::{BeaconError, IdentityKind, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::notifications::{AuthNotification, NotificationHub};
use super::ports::{NewUser, UserDirectory};
use crate::dispatch::RequestDispatcher;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

/// Makes sure the service user exists and is authenticated.
pub struct ServiceUserProvisioner {
    dispatcher: RequestDispatcher,
    notifications: NotificationHub,
}

impl ServiceUserProvisioner {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        let notifications = dispatcher.notifications().clone();
        Self { dispatcher, notifications }
    }

    /// Authenticate the stored service user, creating one through
    /// `directory` when the slot holds no credentials.
    ///
    /// A creation failure, or a login refused as unauthorized, discards the
    /// slot and starts over with a fresh user, up to a fixed number of
    /// attempts. A failed role assignment is reported but does not stop
    /// provisioning.
    ///
    /// # Errors
    /// Returns the last creation or authentication error once every attempt
    /// failed, or any other authentication error immediately.
    #[instrument(skip_all)]
    pub async fn ensure(&self, directory: &dyn UserDirectory) -> Result<()> {
        let vault = self.dispatcher.vault();
        let mut last_error = BeaconError::Internal("service user was never attempted".into());

        for attempt in 1..=SERVICE_USER_CREATION_ATTEMPTS {
            let slot = vault.get(IdentityKind::ServiceUser).await?;
            if !slot.has_user_credentials() {
                if let Err(err) = self.create(directory).await {
                    warn!(attempt, error = %err, "Service user creation failed");
                    last_error = err;
                    continue;
                }
            }

            match self.dispatcher.authenticate(IdentityKind::ServiceUser).await {
                Ok(()) => {
                    info!(attempt, "Service user ready");
                    return Ok(());
                }
                Err(err @ BeaconError::Unauthorized(_)) => {
                    warn!(attempt, error = %err, "Service user refused, recreating");
                    vault.reset(IdentityKind::ServiceUser).await?;
                    last_error = err;
                }
                Err(err) => return Err(err),
            }
        }

        self.notifications.publish(AuthNotification::ServiceUserCreationFailed);
        Err(last_error)
    }

    async fn create(&self, directory: &dyn UserDirectory) -> Result<()> {
        let user = NewUser {
            username: Uuid::new_v4().to_string(),
            password: generate_password(),
            first_name: "SDK".into(),
            last_name: Some("User".into()),
        };

        let user_id = directory.create_user(&user).await?;

        let vault = self.dispatcher.vault();
        vault.update_credentials(IdentityKind::ServiceUser, &user.username, &user.password).await?;
        vault.set_user_id(IdentityKind::ServiceUser, user_id).await?;

        let role_id = self.dispatcher.config().sdk_user_role;
        if let Err(err) = directory.assign_role(user_id, role_id).await {
            warn!(user_id, role_id, error = %err, "Role assignment failed");
            self.notifications.publish(AuthNotification::ServiceUserRoleAssignmentFailed);
        }
        Ok(())
    }
}

/// Three upper case letters, three lower case letters and three digits in
/// random order.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    let mut chars: Vec<char> = [UPPERCASE, LOWERCASE, DIGITS]
        .iter()
        .flat_map(|alphabet| {
            (0..GENERATED_PASSWORD_GROUP_LEN)
                .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
                .collect::<Vec<_>>()
        })
        .collect();
    chars.shuffle(&mut rng);
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use beacon_domain::validation::validate_password;
    use beacon_domain::{Credential, DispatcherConfig, UnauthorizedReason};
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::auth::vault::CredentialVault;
    use crate::http::HttpMethod;
    use crate::testing::{test_platform_config, InMemoryCredentialStore, MockTransport};

    #[derive(Default)]
    struct FakeDirectory {
        created: Mutex<Vec<NewUser>>,
        roles: Mutex<Vec<(i64, i64)>>,
        fail_creation: bool,
        fail_roles: bool,
    }

    #[async_trait]
    impl UserDirectory for FakeDirectory {
        async fn create_user(&self, user: &NewUser) -> Result<i64> {
            if self.fail_creation {
                return Err(BeaconError::UnhandledHttp { status: 409, error_code: None });
            }
            let mut created = self.created.lock();
            created.push(user.clone());
            Ok(100 + i64::try_from(created.len()).unwrap_or_default())
        }

        async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<()> {
            if self.fail_roles {
                return Err(BeaconError::Forbidden);
            }
            self.roles.lock().push((user_id, role_id));
            Ok(())
        }
    }

    fn provisioner(
        transport: &Arc<MockTransport>,
        seed: Vec<Credential>,
    ) -> (ServiceUserProvisioner, Arc<InMemoryCredentialStore>, NotificationHub) {
        let store = Arc::new(InMemoryCredentialStore::with_credentials(seed));
        let hub = NotificationHub::default();
        let dispatcher = RequestDispatcher::new(
            Arc::new(test_platform_config()),
            &DispatcherConfig::default(),
            transport.clone(),
            Arc::new(CredentialVault::new(store.clone())),
            hub.clone(),
        );
        (ServiceUserProvisioner::new(dispatcher), store, hub)
    }

    fn tokens() -> serde_json::Value {
        json!({ "access_token": "A", "refresh_token": "R" })
    }

    #[test]
    fn generated_passwords_satisfy_the_password_rules() {
        for _ in 0..50 {
            let password = generate_password();
            assert_eq!(password.len(), 9);
            assert_eq!(password.chars().filter(char::is_ascii_uppercase).count(), 3);
            assert_eq!(password.chars().filter(char::is_ascii_lowercase).count(), 3);
            assert_eq!(password.chars().filter(char::is_ascii_digit).count(), 3);
            assert!(validate_password(&password).is_ok());
        }
    }

    #[tokio::test]
    async fn creates_assigns_and_authenticates() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(HttpMethod::Post, "/v2/token", 200, tokens());
        let (provisioner, store, _) = provisioner(&transport, vec![]);
        let directory = FakeDirectory::default();

        provisioner.ensure(&directory).await.unwrap();

        let created = directory.created.lock().clone();
        assert_eq!(created.len(), 1);
        assert!(Uuid::parse_str(&created[0].username).is_ok());
        assert_eq!(*directory.roles.lock(), vec![(101, 40)]);

        let stored = store.stored(IdentityKind::ServiceUser).unwrap();
        assert_eq!(stored.username.as_deref(), Some(created[0].username.as_str()));
        assert_eq!(stored.password.as_deref(), Some(created[0].password.as_str()));
        assert_eq!(stored.user_id, Some(101));
        assert_eq!(stored.access_token.as_deref(), Some("A"));

        let login = &transport.requests_to(HttpMethod::Post, "/v2/token")[0];
        assert_eq!(login.form_value("grant_type"), Some("password"));
    }

    #[tokio::test]
    async fn existing_user_is_only_authenticated() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(HttpMethod::Post, "/v2/token", 200, tokens());
        let existing =
            Credential::with_user_credentials(IdentityKind::ServiceUser, "svc", "AbcDef123");
        let (provisioner, _, _) = provisioner(&transport, vec![existing]);
        let directory = FakeDirectory::default();

        provisioner.ensure(&directory).await.unwrap();

        assert!(directory.created.lock().is_empty());
    }

    #[tokio::test]
    async fn refused_user_is_recreated() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(
            HttpMethod::Post,
            "/v2/token",
            401,
            json!({ "error": "Authentication failed.", "error_description": "Account locked." }),
        );
        transport.respond_json(HttpMethod::Post, "/v2/token", 200, tokens());
        let existing =
            Credential::with_user_credentials(IdentityKind::ServiceUser, "svc", "AbcDef123");
        let (provisioner, store, _) = provisioner(&transport, vec![existing]);
        let directory = FakeDirectory::default();

        provisioner.ensure(&directory).await.unwrap();

        assert_eq!(directory.created.lock().len(), 1);
        let stored = store.stored(IdentityKind::ServiceUser).unwrap();
        assert_ne!(stored.username.as_deref(), Some("svc"));
    }

    #[tokio::test]
    async fn role_failure_is_reported_but_not_fatal() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(HttpMethod::Post, "/v2/token", 200, tokens());
        let (provisioner, _, hub) = provisioner(&transport, vec![]);
        let mut notifications = hub.subscribe();
        let directory = FakeDirectory { fail_roles: true, ..FakeDirectory::default() };

        provisioner.ensure(&directory).await.unwrap();

        assert_eq!(
            notifications.try_recv().unwrap(),
            AuthNotification::ServiceUserRoleAssignmentFailed
        );
    }

    #[tokio::test]
    async fn gives_up_after_every_attempt_failed() {
        let transport = Arc::new(MockTransport::new());
        let (provisioner, _, hub) = provisioner(&transport, vec![]);
        let mut notifications = hub.subscribe();
        let directory = FakeDirectory { fail_creation: true, ..FakeDirectory::default() };

        let result = provisioner.ensure(&directory).await;

        assert!(matches!(result, Err(BeaconError::UnhandledHttp { status: 409, .. })));
        assert_eq!(notifications.try_recv().unwrap(), AuthNotification::ServiceUserCreationFailed);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn repeated_refusals_exhaust_the_attempts() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_json(
            HttpMethod::Post,
            "/v2/token",
            401,
            json!({ "error": "Authentication failed.", "error_description": "Credentials incorrect." }),
        );
        let (provisioner, _, _) = provisioner(&transport, vec![]);
        let directory = FakeDirectory::default();

        let result = provisioner.ensure(&directory).await;

        assert_eq!(
            result.unwrap_err(),
            BeaconError::Unauthorized(UnauthorizedReason::CredentialIncorrect)
        );
        assert_eq!(directory.created.lock().len(), SERVICE_USER_CREATION_ATTEMPTS);
    }
}
