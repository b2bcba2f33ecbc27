//! Stamps host and account context onto outgoing events.

use std::sync::Arc;

use beacon_domain::constants::event_keys;
use beacon_domain::{Event, EventRecord, PlatformConfig, Result};
use serde_json::{Map, Value};

use super::ports::{DeviceInfoProvider, LocationProvider};
use crate::auth::vault::CredentialVault;

pub struct EventEnricher {
    config: Arc<PlatformConfig>,
    vault: Arc<CredentialVault>,
    device: Arc<dyn DeviceInfoProvider>,
    location: Arc<dyn LocationProvider>,
}

impl EventEnricher {
    pub fn new(
        config: Arc<PlatformConfig>,
        vault: Arc<CredentialVault>,
        device: Arc<dyn DeviceInfoProvider>,
        location: Arc<dyn LocationProvider>,
    ) -> Self {
        Self { config, vault, device, location }
    }

    /// Validate `event` and turn it into the record the backend expects.
    ///
    /// The user id is taken from whichever user identity requests currently
    /// run as, and is omitted until that user exists.
    ///
    /// # Errors
    /// Returns `InvalidInput(InvalidEvent)` for a blank event type, or the
    /// credential store's error while loading the user identity.
    pub async fn prepare(&self, event: Event) -> Result<EventRecord> {
        event.validate()?;
        let mut record = event.into_record();

        record.insert(event_keys::PROJECT_ID, Value::from(self.config.project_id));
        record.insert(event_keys::APPLICATION_ID, Value::from(self.config.application_id));

        let device = self.device.device_info();
        record.insert(event_keys::DEVICE_TYPE, Value::String(device.device_type));
        record.insert(event_keys::OS_VERSION, Value::String(device.os_version));
        if let Some(version) = device.application_version {
            record.insert(event_keys::APPLICATION_VERSION, Value::String(version));
        }
        if let Some(installation_id) = device.installation_id {
            record.insert(event_keys::INSTALLATION_ID, Value::String(installation_id));
        }

        let user = self.vault.get(self.vault.preferred_user_identity()).await?;
        if let Some(user_id) = user.user_id {
            record.insert(event_keys::USER_ID, Value::from(user_id));
        }

        if let Some(point) = self.location.current_location().await {
            let mut geolocation = Map::new();
            geolocation.insert(event_keys::LATITUDE.to_owned(), Value::from(point.latitude));
            geolocation.insert(event_keys::LONGITUDE.to_owned(), Value::from(point.longitude));
            record.insert(event_keys::GEOLOCATION, Value::Object(geolocation));
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use beacon_domain::{BeaconError, Credential, GeoPoint, IdentityKind, InvalidInputReason};

    use serde_json::json;

    use super::*;
    use crate::events::ports::DeviceInfo;
    use crate::testing::{
        test_platform_config, FixedLocation, InMemoryCredentialStore, StaticDeviceInfo,
    };

    fn enricher(
        credentials: Vec<Credential>,
        device: DeviceInfo,
        location: Option<GeoPoint>,
    ) -> (EventEnricher, Arc<CredentialVault>) {
        let vault = Arc::new(CredentialVault::new(Arc::new(
            InMemoryCredentialStore::with_credentials(credentials),
        )));
        let enricher = EventEnricher::new(
            Arc::new(test_platform_config()),
            Arc::clone(&vault),
            Arc::new(StaticDeviceInfo(device)),
            Arc::new(FixedLocation(location)),
        );
        (enricher, vault)
    }

    #[tokio::test]
    async fn adds_account_and_device_context() {
        let device = DeviceInfo {
            device_type: "Desktop".into(),
            os_version: "14.1".into(),
            application_version: None,
            installation_id: None,
        };
        let (enricher, _) = enricher(vec![], device, None);

        let record = enricher.prepare(Event::new("Open Application")).await.unwrap();

        assert_eq!(record.get("EventType"), Some(&json!("Open Application")));
        assert_eq!(record.get("ProjectId"), Some(&json!(20)));
        assert_eq!(record.get("PhoenixIdentity_ApplicationId"), Some(&json!(10)));
        assert_eq!(record.get("DeviceType"), Some(&json!("Desktop")));
        assert_eq!(record.get("OperatingSystemVersion"), Some(&json!("14.1")));
        for absent in [
            "ApplicationVersion",
            "PhoenixIdentity_InstallationId",
            "PhoenixIdentity_UserId",
            "Geolocation",
        ] {
            assert!(record.get(absent).is_none(), "{absent} should be omitted");
        }
    }

    #[tokio::test]
    async fn includes_optional_context_when_known() {
        let mut service_user =
            Credential::with_user_credentials(IdentityKind::ServiceUser, "svc", "Pw1Pw1Pw1");
        service_user.user_id = Some(77);
        let device = DeviceInfo {
            installation_id: Some("install-1".into()),
            ..StaticDeviceInfo::default().0
        };
        let location = GeoPoint { latitude: 51.5, longitude: -0.12 };
        let (enricher, _) = enricher(vec![service_user], device, Some(location));

        let record = enricher.prepare(Event::new("Screen Viewed")).await.unwrap();

        assert_eq!(record.get("ApplicationVersion"), Some(&json!("2.3.4")));
        assert_eq!(record.get("PhoenixIdentity_InstallationId"), Some(&json!("install-1")));
        assert_eq!(record.get("PhoenixIdentity_UserId"), Some(&json!(77)));
        assert_eq!(
            record.get("Geolocation"),
            Some(&json!({ "Latitude": 51.5, "Longitude": -0.12 }))
        );
    }

    #[tokio::test]
    async fn user_id_follows_the_interactive_login() {
        let mut service_user = Credential::empty(IdentityKind::ServiceUser);
        service_user.user_id = Some(1);
        let mut interactive = Credential::empty(IdentityKind::InteractiveUser);
        interactive.user_id = Some(2);
        let (enricher, vault) =
            enricher(vec![service_user, interactive], StaticDeviceInfo::default().0, None);

        vault.set_interactive_login(true);
        let record = enricher.prepare(Event::new("Login")).await.unwrap();

        assert_eq!(record.get("PhoenixIdentity_UserId"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn blank_event_type_is_rejected() {
        let (enricher, _) = enricher(vec![], StaticDeviceInfo::default().0, None);

        let result = enricher.prepare(Event::new("  ")).await;

        assert_eq!(
            result.unwrap_err(),
            BeaconError::InvalidInput(InvalidInputReason::InvalidEvent)
        );
    }
}
