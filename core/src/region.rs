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
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info};

pub const DEFAULT_DEVICE_PROPERTIES_PATH: &str = "/etc/device.properties";
const FRIENDLY_ID_KEY: &str = "FRIENDLY_ID";
const US_REGION_MARKER: &str = " US";

/// Broadcast region the platform is built for. Decides 50 Hz vs 60 Hz preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionMode {
    Eu,
    #[default]
    Us,
}

impl RegionMode {
    pub fn from_eu_flag(is_eu: bool) -> Self {
        if is_eu { RegionMode::Eu } else { RegionMode::Us }
    }

    pub fn is_eu(&self) -> bool {
        matches!(self, RegionMode::Eu)
    }
}

impl fmt::Display for RegionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionMode::Eu => write!(f, "EU"),
            RegionMode::Us => write!(f, "US"),
        }
    }
}

/// Source of the platform region. Queried once at startup.
pub trait PlatformRegion {
    fn is_eu_platform(&self) -> bool;

    fn region_mode(&self) -> RegionMode {
        RegionMode::from_eu_flag(self.is_eu_platform())
    }
}

/// Region known up front, e.g. from the command line or in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedRegion(pub RegionMode);

impl PlatformRegion for FixedRegion {
    fn is_eu_platform(&self) -> bool {
        self.0.is_eu()
    }
}

/// Region read from a `device.properties` file.
///
/// The first line mentioning `FRIENDLY_ID` decides: `" US"` in it means US, anything else
/// (UK, IT, DE, ...) means EU. An unreadable file or a missing key means US.
#[derive(Debug, Clone)]
pub struct DevicePropertiesRegion {
    path: PathBuf,
}

impl DevicePropertiesRegion {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn detect(&self) -> io::Result<bool> {
        let content = fs::read_to_string(&self.path)?;
        Ok(is_eu_from_properties(&content))
    }
}

impl Default for DevicePropertiesRegion {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_PROPERTIES_PATH)
    }
}

impl PlatformRegion for DevicePropertiesRegion {
    fn is_eu_platform(&self) -> bool {
        match self.detect() {
            Ok(is_eu) => is_eu,
            Err(e) => {
                error!("Unable to open file {}: {}", self.path.display(), e);
                false
            }
        }
    }
}

/// Decides the region from `device.properties` content.
pub fn is_eu_from_properties(content: &str) -> bool {
    let Some(line) = content.lines().find(|line| line.contains(FRIENDLY_ID_KEY)) else {
        info!("No {} entry in device properties, assuming US region", FRIENDLY_ID_KEY);
        return false;
    };
    if line.contains(US_REGION_MARKER) {
        info!("Detected US region: {}", line);
        false
    } else {
        info!("Detected EU region: {}", line);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn us_friendly_id_is_us() {
        assert!(!is_eu_from_properties("BOX_TYPE=XG1\nFRIENDLY_ID=\"Flex US\"\n"));
    }

    #[test]
    fn other_friendly_id_is_eu() {
        assert!(is_eu_from_properties("FRIENDLY_ID=\"Sky UK\"\nBUILD_TYPE=prod\n"));
        assert!(is_eu_from_properties("FRIENDLY_ID=IT"));
    }

    #[test]
    fn only_first_friendly_id_line_counts() {
        assert!(is_eu_from_properties("FRIENDLY_ID=DE\nFRIENDLY_ID=\"x US\"\n"));
    }

    #[test]
    fn missing_key_is_us() {
        assert!(!is_eu_from_properties("MODEL_NUM=ABC\n"));
        assert!(!is_eu_from_properties(""));
    }

    #[test]
    fn reads_region_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MODEL_NUM=ABC").unwrap();
        writeln!(file, "FRIENDLY_ID=\"Sky UK\"").unwrap();
        let region = DevicePropertiesRegion::new(file.path());
        assert!(region.is_eu_platform());
        assert_eq!(region.region_mode(), RegionMode::Eu);
    }

    #[test]
    fn missing_file_is_us() {
        let dir = tempfile::tempdir().unwrap();
        let region = DevicePropertiesRegion::new(dir.path().join("device.properties"));
        assert!(!region.is_eu_platform());
    }

    #[test]
    fn fixed_region() {
        assert!(FixedRegion(RegionMode::Eu).is_eu_platform());
        assert_eq!(FixedRegion(RegionMode::Us).region_mode(), RegionMode::Us);
    }
}
