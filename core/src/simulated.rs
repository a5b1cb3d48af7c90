// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory display HAL.
//!
//! Stands in for the vendor display/video-port HAL: a [`DisplayProfile`] describes which ports
//! exist, what is plugged into them and what the user persisted. Every resolution change and
//! background color request is recorded so callers can inspect what would have reached the
//! hardware.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Error};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::display::{BackgroundColor, DisplayEdid, DisplayQuery, PersistenceStore, ResolutionApplier, VideoPortType};
use crate::errors::{ConfigError, DisplayError};
use crate::resolution::PLATFORM_DEFAULT_RESOLUTION;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortProfile {
    pub available: bool,
    pub connected: bool,
    pub edid: DisplayEdid,
    pub edid_bytes: Vec<u8>,
    /// DDC readiness polls answered "not ready" before the line comes up.
    pub ddc_ready_after: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayProfile {
    pub ports: BTreeMap<VideoPortType, PortProfile>,
    pub persisted: BTreeMap<VideoPortType, String>,
    pub force_disable_4k: bool,
    pub ignore_edid: bool,
}

impl DisplayProfile {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// HDMI port with a connected HDMI sink advertising `supported`, and `persisted` as the user choice.
    pub fn hdmi_sink(persisted: &str, supported: &[&str]) -> Self {
        let mut profile = DisplayProfile::default();
        profile.ports.insert(
            VideoPortType::Hdmi,
            PortProfile {
                available: true,
                connected: true,
                edid: DisplayEdid {
                    supported_resolutions: supported.iter().map(|s| s.to_string()).collect(),
                    hdmi_device_type: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        profile.persisted.insert(VideoPortType::Hdmi, persisted.to_string());
        profile
    }
}

/// A resolution change that reached the simulated hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedResolution {
    pub port: VideoPortType,
    pub resolution: String,
    pub force_compatible: bool,
}

#[derive(Debug, Default)]
pub struct SimulatedPlatform {
    profile: Mutex<DisplayProfile>,
    ddc_polls: Mutex<u32>,
    applied: Mutex<Vec<AppliedResolution>>,
    backgrounds: Mutex<Vec<(VideoPortType, BackgroundColor)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The guarded data stays consistent even if a holder panicked mid-test.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatedPlatform {
    pub fn new(profile: DisplayProfile) -> Self {
        Self {
            profile: Mutex::new(profile),
            ..Default::default()
        }
    }

    pub fn profile(&self) -> DisplayProfile {
        lock(&self.profile).clone()
    }

    pub fn set_connected(&self, port: VideoPortType, connected: bool) {
        let mut profile = lock(&self.profile);
        let entry = profile.ports.entry(port).or_default();
        entry.available = true;
        entry.connected = connected;
        *lock(&self.ddc_polls) = 0;
    }

    pub fn set_port_available(&self, port: VideoPortType, available: bool) {
        lock(&self.profile).ports.entry(port).or_default().available = available;
    }

    pub fn set_edid(&self, port: VideoPortType, edid: DisplayEdid) {
        lock(&self.profile).ports.entry(port).or_default().edid = edid;
    }

    pub fn set_supported_resolutions(&self, port: VideoPortType, supported: Vec<String>) {
        lock(&self.profile).ports.entry(port).or_default().edid.supported_resolutions = supported;
    }

    pub fn set_edid_bytes(&self, port: VideoPortType, bytes: Vec<u8>) {
        lock(&self.profile).ports.entry(port).or_default().edid_bytes = bytes;
    }

    pub fn set_persisted(&self, port: VideoPortType, resolution: &str) {
        lock(&self.profile).persisted.insert(port, resolution.to_string());
    }

    pub fn set_force_disable_4k(&self, disabled: bool) {
        lock(&self.profile).force_disable_4k = disabled;
    }

    pub fn applied(&self) -> Vec<AppliedResolution> {
        lock(&self.applied).clone()
    }

    pub fn take_applied(&self) -> Vec<AppliedResolution> {
        std::mem::take(&mut *lock(&self.applied))
    }

    pub fn last_applied(&self, port: VideoPortType) -> Option<AppliedResolution> {
        lock(&self.applied).iter().rev().find(|a| a.port == port).cloned()
    }

    pub fn background_colors(&self) -> Vec<(VideoPortType, BackgroundColor)> {
        lock(&self.backgrounds).clone()
    }

    pub fn ddc_polls(&self) -> u32 {
        *lock(&self.ddc_polls)
    }

    fn port(&self, port: VideoPortType) -> Result<PortProfile, DisplayError> {
        lock(&self.profile)
            .ports
            .get(&port)
            .filter(|p| p.available)
            .cloned()
            .ok_or(DisplayError::PortNotAvailable(port))
    }
}

#[async_trait]
impl DisplayQuery for SimulatedPlatform {
    async fn is_port_available(&self, port: VideoPortType) -> Result<bool, DisplayError> {
        Ok(self.port(port).is_ok())
    }

    async fn is_display_connected(&self, port: VideoPortType) -> Result<bool, DisplayError> {
        Ok(self.port(port)?.connected)
    }

    async fn edid(&self, port: VideoPortType) -> Result<DisplayEdid, DisplayError> {
        let port = self.port(port)?;
        if port.connected {
            Ok(port.edid)
        } else {
            Ok(DisplayEdid::default())
        }
    }

    async fn edid_bytes(&self, port: VideoPortType) -> Result<Vec<u8>, DisplayError> {
        let port = self.port(port)?;
        if port.connected {
            Ok(port.edid_bytes)
        } else {
            Ok(Vec::new())
        }
    }

    async fn is_ddc_line_ready(&self, port: VideoPortType) -> Result<bool, DisplayError> {
        let ready_after = self.port(port)?.ddc_ready_after;
        let mut polls = lock(&self.ddc_polls);
        *polls += 1;
        Ok(*polls > ready_after)
    }
}

#[async_trait]
impl ResolutionApplier for SimulatedPlatform {
    async fn apply(&self, port: VideoPortType, resolution: &str, force_compatible: bool) -> Result<(), Error> {
        self.port(port).map_err(|e| anyhow!(e))?;
        debug!("Simulated HAL: {} <- {} (force_compatible={})", port, resolution, force_compatible);
        lock(&self.applied).push(AppliedResolution {
            port,
            resolution: resolution.to_string(),
            force_compatible,
        });
        Ok(())
    }

    async fn set_background_color(&self, port: VideoPortType, color: BackgroundColor) -> Result<(), Error> {
        lock(&self.backgrounds).push((port, color));
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for SimulatedPlatform {
    async fn persisted_resolution(&self, port: VideoPortType) -> Result<String, Error> {
        Ok(lock(&self.profile)
            .persisted
            .get(&port)
            .cloned()
            .unwrap_or_else(|| PLATFORM_DEFAULT_RESOLUTION.to_string()))
    }

    async fn is_4k_disabled(&self) -> Result<bool, Error> {
        Ok(lock(&self.profile).force_disable_4k)
    }

    async fn ignore_edid(&self) -> Result<bool, Error> {
        Ok(lock(&self.profile).ignore_edid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "ports": {
            "hdmi": {
                "available": true,
                "connected": true,
                "edid": {
                    "supported_resolutions": ["720p", "1080i", "1080p60"],
                    "hdmi_device_type": true,
                    "monitor_name": "Living room TV",
                    "physical_address": [1, 0, 0, 0]
                },
                "ddc_ready_after": 2
            },
            "component": { "available": true }
        },
        "persisted": { "hdmi": "1080p50" },
        "force_disable_4k": true
    }"#;

    #[test]
    fn profile_from_json() {
        let profile = DisplayProfile::from_json(PROFILE).unwrap();
        let hdmi = &profile.ports[&VideoPortType::Hdmi];
        assert!(hdmi.connected);
        assert_eq!(hdmi.edid.supported_resolutions, vec!["720p", "1080i", "1080p60"]);
        assert_eq!(hdmi.edid.monitor_name.as_deref(), Some("Living room TV"));
        assert!(!profile.ports[&VideoPortType::Component].connected);
        assert_eq!(profile.persisted[&VideoPortType::Hdmi], "1080p50");
        assert!(profile.force_disable_4k);
        assert!(!profile.ignore_edid);
    }

    #[test]
    fn malformed_profile_is_rejected() {
        assert!(matches!(DisplayProfile::from_json("{\"ports\": 3}"), Err(ConfigError::Profile(_))));
    }

    #[tokio::test]
    async fn queries_follow_profile() {
        let platform = SimulatedPlatform::new(DisplayProfile::from_json(PROFILE).unwrap());
        assert!(platform.is_port_available(VideoPortType::Hdmi).await.unwrap());
        assert!(!platform.is_port_available(VideoPortType::Rf).await.unwrap());
        assert!(matches!(
            platform.is_display_connected(VideoPortType::Rf).await,
            Err(DisplayError::PortNotAvailable(VideoPortType::Rf))
        ));
        assert_eq!(platform.persisted_resolution(VideoPortType::Hdmi).await.unwrap(), "1080p50");
        assert_eq!(platform.persisted_resolution(VideoPortType::Component).await.unwrap(), "720p");
        assert!(platform.is_4k_disabled().await.unwrap());
        assert!(!platform.ignore_edid().await.unwrap());

        assert!(!platform.is_ddc_line_ready(VideoPortType::Hdmi).await.unwrap());
        assert!(!platform.is_ddc_line_ready(VideoPortType::Hdmi).await.unwrap());
        assert!(platform.is_ddc_line_ready(VideoPortType::Hdmi).await.unwrap());

        platform.set_connected(VideoPortType::Hdmi, false);
        assert!(!platform.edid(VideoPortType::Hdmi).await.unwrap().is_ready());
    }

    #[tokio::test]
    async fn apply_records_changes() {
        let platform = SimulatedPlatform::new(DisplayProfile::hdmi_sink("720p", &["720p"]));
        platform.apply(VideoPortType::Hdmi, "720p", true).await.unwrap();
        assert!(platform.apply(VideoPortType::Rf, "480i", false).await.is_err());
        assert_eq!(
            platform.last_applied(VideoPortType::Hdmi),
            Some(AppliedResolution { port: VideoPortType::Hdmi, resolution: "720p".into(), force_compatible: true })
        );
        assert_eq!(platform.take_applied().len(), 1);
        assert!(platform.applied().is_empty());
    }
}
