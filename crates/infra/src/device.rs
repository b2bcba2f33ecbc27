//! Host probes used to enrich telemetry.

use async_trait::async_trait;
use beacon_core::{DeviceInfo, DeviceInfoProvider, LocationProvider};
use beacon_domain::GeoPoint;
use sysinfo::System;

/// Device facts read once from the operating system.
#[derive(Debug, Clone)]
pub struct HostDeviceInfo {
    info: DeviceInfo,
}

impl HostDeviceInfo {
    /// Probe the host. `application_version` and `installation_id` come from
    /// the embedding application.
    pub fn detect(application_version: Option<String>, installation_id: Option<String>) -> Self {
        let device_type = System::name().unwrap_or_else(|| std::env::consts::OS.to_string());
        let os_version = System::long_os_version()
            .or_else(System::os_version)
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            info: DeviceInfo { device_type, os_version, application_version, installation_id },
        }
    }
}

impl Default for HostDeviceInfo {
    fn default() -> Self {
        Self::detect(Some(env!("CARGO_PKG_VERSION").to_string()), None)
    }
}

impl DeviceInfoProvider for HostDeviceInfo {
    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }
}

/// Location provider for hosts without positioning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_location(&self) -> Option<GeoPoint> {
        None
    }
}
