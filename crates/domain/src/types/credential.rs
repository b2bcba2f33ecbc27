//! Identities and the token material kept for each of them.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::errors::{BeaconError, Result};
use crate::impl_domain_status_conversions;

/// The independent identities a client keeps alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// The application itself, authenticated with client credentials only.
    Application,
    /// A silently provisioned per-installation user.
    ServiceUser,
    /// A user who logged in interactively.
    InteractiveUser,
}

impl_domain_status_conversions!(IdentityKind {
    Application => "application",
    ServiceUser => "service_user",
    InteractiveUser => "interactive_user",
});

impl IdentityKind {
    /// Every identity slot, in a stable order.
    pub const ALL: [Self; 3] = [Self::Application, Self::ServiceUser, Self::InteractiveUser];

    /// User identities carry username, password and refresh token.
    pub const fn is_user(self) -> bool {
        !matches!(self, Self::Application)
    }

    /// Only the service user's generated password is ever written to storage.
    pub const fn persists_password(self) -> bool {
        matches!(self, Self::ServiceUser)
    }
}

/// Token material returned by a successful token request.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// In-memory and persisted record of one identity's token material.
///
/// A credential starts empty and is only mutated by a successful
/// authentication step or by an explicit reset.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub kind: IdentityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl Credential {
    /// An empty credential for the given identity slot.
    pub const fn empty(kind: IdentityKind) -> Self {
        Self {
            kind,
            access_token: None,
            refresh_token: None,
            username: None,
            password: None,
            user_id: None,
        }
    }

    /// A user credential carrying only a username and password.
    pub fn with_user_credentials(
        kind: IdentityKind,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::empty(kind)
        }
    }

    /// An access token is present and, for user identities, so is a refresh
    /// token.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && (!self.kind.is_user() || self.refresh_token.is_some())
    }

    /// Both a username and a password are available for a password grant.
    pub fn has_user_credentials(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        filled(&self.username) && filled(&self.password)
    }

    /// The copy of this credential that may be written to storage.
    ///
    /// Application credentials never carry user material or a refresh token.
    /// Passwords survive only for the service user.
    pub fn persisted_form(&self) -> Self {
        let mut persisted = self.clone();
        if !self.kind.is_user() {
            persisted.username = None;
            persisted.refresh_token = None;
            persisted.password = None;
        }
        if !self.kind.persists_password() {
            if let Some(mut password) = persisted.password.take() {
                password.zeroize();
            }
        }
        persisted
    }

    /// Store the tokens of a successful grant.
    pub fn apply_grant(&mut self, grant: &TokenGrant) {
        self.access_token = Some(grant.access_token.clone());
        if self.kind.is_user() {
            if let Some(refresh) = &grant.refresh_token {
                self.refresh_token = Some(refresh.clone());
            }
        }
    }

    /// Drop both tokens, keeping user material.
    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }

    /// Drop and zero the in-memory password.
    pub fn clear_password(&mut self) {
        if let Some(mut password) = self.password.take() {
            password.zeroize();
        }
    }

    /// Check the field-group invariants that must hold before a write.
    ///
    /// # Errors
    /// Returns `BeaconError::Internal` naming the missing field.
    pub fn check_storable(&self) -> Result<()> {
        if self.kind.is_user() && self.access_token.is_some() && self.refresh_token.is_none() {
            return Err(BeaconError::Internal(format!(
                "{} credential has an access token but no refresh token",
                self.kind
            )));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(BeaconError::Internal(format!(
                "{} credential has a password but no username",
                self.kind
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn with_tokens(kind: IdentityKind, access: Option<&str>, refresh: Option<&str>) -> Credential {
        Credential {
            access_token: access.map(str::to_string),
            refresh_token: refresh.map(str::to_string),
            ..Credential::empty(kind)
        }
    }

    #[test]
    fn is_authenticated_truth_table() {
        let cases = [
            (IdentityKind::Application, None, None, false),
            (IdentityKind::Application, Some("a"), None, true),
            (IdentityKind::Application, None, Some("r"), false),
            (IdentityKind::Application, Some("a"), Some("r"), true),
            (IdentityKind::ServiceUser, None, None, false),
            (IdentityKind::ServiceUser, Some("a"), None, false),
            (IdentityKind::ServiceUser, None, Some("r"), false),
            (IdentityKind::ServiceUser, Some("a"), Some("r"), true),
            (IdentityKind::InteractiveUser, None, None, false),
            (IdentityKind::InteractiveUser, Some("a"), None, false),
            (IdentityKind::InteractiveUser, None, Some("r"), false),
            (IdentityKind::InteractiveUser, Some("a"), Some("r"), true),
        ];

        for (kind, access, refresh, expected) in cases {
            assert_eq!(
                with_tokens(kind, access, refresh).is_authenticated(),
                expected,
                "{kind} access={access:?} refresh={refresh:?}"
            );
        }
    }

    #[test]
    fn application_persisted_form_strips_user_material() {
        let credential = Credential {
            access_token: Some("a".into()),
            refresh_token: Some("r".into()),
            username: Some("u".into()),
            password: Some("p".into()),
            ..Credential::empty(IdentityKind::Application)
        };

        let persisted = credential.persisted_form();
        assert_eq!(persisted.access_token.as_deref(), Some("a"));
        assert!(persisted.refresh_token.is_none());
        assert!(persisted.username.is_none());
        assert!(persisted.password.is_none());
    }

    #[test]
    fn only_service_user_persists_password() {
        let service =
            Credential::with_user_credentials(IdentityKind::ServiceUser, "svc", "Secret123");
        let interactive =
            Credential::with_user_credentials(IdentityKind::InteractiveUser, "dev", "Secret123");

        assert_eq!(service.persisted_form().password.as_deref(), Some("Secret123"));
        assert!(interactive.persisted_form().password.is_none());
        assert_eq!(interactive.persisted_form().username.as_deref(), Some("dev"));
    }

    #[test]
    fn apply_grant_keeps_refresh_when_absent() {
        let mut credential =
            with_tokens(IdentityKind::ServiceUser, Some("old"), Some("refresh-old"));
        credential.apply_grant(&TokenGrant { access_token: "new".into(), refresh_token: None });

        assert_eq!(credential.access_token.as_deref(), Some("new"));
        assert_eq!(credential.refresh_token.as_deref(), Some("refresh-old"));
    }

    #[test]
    fn application_grant_ignores_refresh_token() {
        let mut credential = Credential::empty(IdentityKind::Application);
        credential.apply_grant(&TokenGrant {
            access_token: "B".into(),
            refresh_token: Some("ignored".into()),
        });

        assert_eq!(credential.access_token.as_deref(), Some("B"));
        assert!(credential.refresh_token.is_none());
    }

    #[test]
    fn check_storable_rejects_missing_refresh_for_users() {
        let credential = with_tokens(IdentityKind::InteractiveUser, Some("a"), None);
        assert!(matches!(credential.check_storable(), Err(BeaconError::Internal(_))));

        let app = with_tokens(IdentityKind::Application, Some("a"), None);
        assert!(app.check_storable().is_ok());
    }

    #[test]
    fn check_storable_rejects_password_without_username() {
        let credential = Credential {
            password: Some("p".into()),
            ..Credential::empty(IdentityKind::ServiceUser)
        };
        assert!(credential.check_storable().is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let credential = Credential {
            access_token: Some("very-secret-token".into()),
            password: Some("hunter2".into()),
            username: Some("dev".into()),
            ..Credential::empty(IdentityKind::InteractiveUser)
        };
        let debug = format!("{credential:?}");
        assert!(!debug.contains("very-secret-token"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn identity_kind_round_trips_through_strings() {
        for kind in IdentityKind::ALL {
            assert_eq!(IdentityKind::from_str(&kind.to_string()).unwrap(), kind);
        }
    }
}
