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

use std::fmt;
use std::str::FromStr;

use anyhow::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DisplayError;

/// Video output ports, in the order they are considered when HDMI has no display attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoPortType {
    Hdmi,
    Component,
    /// Baseband composite.
    Composite,
    Rf,
}

impl VideoPortType {
    /// Analog ports, tried in this order when HDMI is not connected.
    pub const ANALOG_PRIORITY: [VideoPortType; 3] = [
        VideoPortType::Component,
        VideoPortType::Composite,
        VideoPortType::Rf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoPortType::Hdmi => "hdmi",
            VideoPortType::Component => "component",
            VideoPortType::Composite => "composite",
            VideoPortType::Rf => "rf",
        }
    }
}

impl fmt::Display for VideoPortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoPortType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hdmi" => Ok(VideoPortType::Hdmi),
            "component" => Ok(VideoPortType::Component),
            "composite" | "bb" => Ok(VideoPortType::Composite),
            "rf" => Ok(VideoPortType::Rf),
            _ => Err(format!("Invalid video port: {}", s)),
        }
    }
}

/// Background color shown behind video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundColor {
    None,
    Blue,
}

/// HDMI source physical address `A.B.C.D`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalAddress(pub u8, pub u8, pub u8, pub u8);

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.0, self.1, self.2, self.3)
    }
}

/// Decoded EDID of the display attached to a port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayEdid {
    /// Resolutions the sink advertises, in EDID order.
    pub supported_resolutions: Vec<String>,
    /// `true` for an HDMI sink, `false` for DVI.
    pub hdmi_device_type: bool,
    pub monitor_name: Option<String>,
    pub manufacturer_id: u32,
    pub product_code: u32,
    pub is_repeater: bool,
    pub physical_address: PhysicalAddress,
}

impl DisplayEdid {
    /// A sink in low power or DVI mode may not report a usable EDID.
    /// Resolution changes wait for the next hotplug in that case.
    pub fn is_ready(&self) -> bool {
        !self.supported_resolutions.is_empty() && self.hdmi_device_type
    }
}

/// Read side of the display HAL.
#[async_trait]
pub trait DisplayQuery: Send + Sync {
    /// Whether the platform has a handle for this port.
    async fn is_port_available(&self, port: VideoPortType) -> Result<bool, DisplayError>;

    async fn is_display_connected(&self, port: VideoPortType) -> Result<bool, DisplayError>;

    async fn edid(&self, port: VideoPortType) -> Result<DisplayEdid, DisplayError>;

    /// Raw EDID bytes, 128 bytes per block. Empty when unavailable.
    async fn edid_bytes(&self, _port: VideoPortType) -> Result<Vec<u8>, DisplayError> {
        Ok(Vec::new())
    }

    /// Whether the HDMI DDC line is ready for a resolution change.
    async fn is_ddc_line_ready(&self, _port: VideoPortType) -> Result<bool, DisplayError> {
        Ok(true)
    }
}

/// Write side of the display HAL.
#[async_trait]
pub trait ResolutionApplier: Send + Sync {
    async fn apply(&self, port: VideoPortType, resolution: &str, force_compatible: bool) -> Result<(), Error>;

    async fn set_background_color(&self, _port: VideoPortType, _color: BackgroundColor) -> Result<(), Error> {
        Ok(())
    }
}

/// User settings that survive reboots.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn persisted_resolution(&self, port: VideoPortType) -> Result<String, Error>;

    /// 4K output disabled by the user or the operator.
    async fn is_4k_disabled(&self) -> Result<bool, Error> {
        Ok(false)
    }

    /// EDID is ignored; resolution is only negotiated on the first HDCP success after boot.
    async fn ignore_edid(&self) -> Result<bool, Error> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edid_readiness() {
        let mut edid = DisplayEdid {
            supported_resolutions: vec!["720p".into()],
            hdmi_device_type: true,
            ..Default::default()
        };
        assert!(edid.is_ready());
        edid.hdmi_device_type = false;
        assert!(!edid.is_ready());
        edid.hdmi_device_type = true;
        edid.supported_resolutions.clear();
        assert!(!edid.is_ready());
    }

    #[test]
    fn port_names_round_trip() {
        for port in [VideoPortType::Hdmi, VideoPortType::Component, VideoPortType::Composite, VideoPortType::Rf] {
            assert_eq!(port.as_str().parse::<VideoPortType>(), Ok(port));
        }
        assert_eq!("BB".parse::<VideoPortType>(), Ok(VideoPortType::Composite));
        assert!("dvi".parse::<VideoPortType>().is_err());
    }
}
