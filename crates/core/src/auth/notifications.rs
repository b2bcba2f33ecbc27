//! Side-channel notifications for conditions a caller cannot act on from a
//! single call result.

use beacon_domain::{IdentityKind, UnauthorizedReason};
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthNotification {
    CredentialsIncorrect(IdentityKind),
    AccountDisabled(IdentityKind),
    AccountLocked(IdentityKind),
    TokenInvalidOrExpired(IdentityKind),
    /// The interactive user's refresh token was refused and only a new
    /// login can recover.
    UserLoginRequired,
    ServiceUserCreationFailed,
    ServiceUserRoleAssignmentFailed,
}

impl AuthNotification {
    /// Notification raised when a login for `kind` is refused for `reason`.
    pub const fn for_login_failure(kind: IdentityKind, reason: UnauthorizedReason) -> Option<Self> {
        match reason {
            UnauthorizedReason::CredentialIncorrect => Some(Self::CredentialsIncorrect(kind)),
            UnauthorizedReason::AccountDisabled => Some(Self::AccountDisabled(kind)),
            UnauthorizedReason::AccountLocked => Some(Self::AccountLocked(kind)),
            UnauthorizedReason::TokenInvalidOrExpired => Some(Self::TokenInvalidOrExpired(kind)),
            UnauthorizedReason::Generic => None,
        }
    }
}

/// Broadcast channel for [`AuthNotification`]s.
///
/// Publishing never blocks and never fails. Notifications sent while nobody
/// is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<AuthNotification>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthNotification> {
        self.sender.subscribe()
    }

    pub fn publish(&self, notification: AuthNotification) {
        debug!(?notification, "Publishing auth notification");
        let _ = self.sender.send(notification);
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_refusals_are_not_broadcast() {
        assert_eq!(
            AuthNotification::for_login_failure(
                IdentityKind::ServiceUser,
                UnauthorizedReason::Generic
            ),
            None
        );
        assert_eq!(
            AuthNotification::for_login_failure(
                IdentityKind::InteractiveUser,
                UnauthorizedReason::AccountLocked
            ),
            Some(AuthNotification::AccountLocked(IdentityKind::InteractiveUser))
        );
    }

    #[tokio::test]
    async fn subscribers_receive_published_notifications() {
        let hub = NotificationHub::default();
        let mut rx = hub.subscribe();

        hub.publish(AuthNotification::UserLoginRequired);

        assert_eq!(rx.recv().await.unwrap(), AuthNotification::UserLoginRequired);
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        NotificationHub::new(0).publish(AuthNotification::ServiceUserCreationFailed);
    }
}
