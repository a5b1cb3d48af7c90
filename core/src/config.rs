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

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};

use crate::errors::ConfigError;
use crate::resolution::PLATFORM_DEFAULT_RESOLUTION;

pub const DEFAULT_DDC_DELAY_PATH: &str = "/opt/ddcDelay";
pub const DEFAULT_DDC_RETRY_COUNT: u32 = 5;

/// Resolutions the platform itself can output on analog ports.
pub const DEFAULT_PLATFORM_RESOLUTIONS: &[&str] = &[
    "480i", "480p", "576i", "576p", "576p50", "720p", "720p50", "1080i", "1080i25", "1080i50",
    "1080p", "1080p24", "1080p30", "1080p50", "1080p60",
];

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Pause between noticing a port handle and querying its connection state.
    pub connect_settle_delay: Duration,
    /// Number of DDC readiness polls before a resolution change on HDMI.
    pub ddc_retry_count: u32,
    pub ddc_poll_interval: Duration,
    /// Resolutions accepted as-is on analog ports.
    pub platform_resolutions: Vec<String>,
    /// Used on analog ports when the persisted resolution is not a platform one, and when 4K is disabled.
    pub platform_default: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            connect_settle_delay: Duration::from_millis(100),
            ddc_retry_count: DEFAULT_DDC_RETRY_COUNT,
            ddc_poll_interval: Duration::from_secs(1),
            platform_resolutions: DEFAULT_PLATFORM_RESOLUTIONS.iter().map(|s| s.to_string()).collect(),
            platform_default: PLATFORM_DEFAULT_RESOLUTION.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Default config with the DDC retry count taken from a ddcDelay file, if one is readable.
    pub fn with_ddc_delay_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let ddc_retry_count = match read_ddc_retry_count(path) {
            Ok(count) => count,
            Err(e) => {
                warn!("{}; using default DDC retry count {}", e, DEFAULT_DDC_RETRY_COUNT);
                DEFAULT_DDC_RETRY_COUNT
            }
        };
        info!("Retry resolution DDC count is {}", ddc_retry_count);
        Self { ddc_retry_count, ..Self::default() }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Tune-ready state of the system when the orchestrator starts.
    pub tune_ready_at_start: bool,
    /// When set, resolution is negotiated on HDCP success only once after boot.
    pub ignore_edid: bool,
    /// Delay before re-applying resolution to an analog port after HDMI disconnect.
    pub disconnect_reapply_delay: Duration,
    /// Delay before the EDID is read back and compared after an HDCP status change.
    pub edid_dump_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tune_ready_at_start: false,
            ignore_edid: false,
            disconnect_reapply_delay: Duration::from_secs(5),
            edid_dump_delay: Duration::from_secs(1),
        }
    }
}

/// Reads the DDC retry count: a single integer, surrounding whitespace allowed.
pub fn read_ddc_retry_count(path: &Path) -> Result<u32, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = content.split_whitespace().next().unwrap_or_default();
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
        path: path.to_path_buf(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_retry_count() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  12").unwrap();
        assert_eq!(read_ddc_retry_count(file.path()).unwrap(), 12);
        assert_eq!(ControllerConfig::with_ddc_delay_file(file.path()).ddc_retry_count, 12);
    }

    #[test]
    fn invalid_retry_count_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "soon").unwrap();
        assert!(matches!(read_ddc_retry_count(file.path()), Err(ConfigError::InvalidValue { .. })));
        assert_eq!(ControllerConfig::with_ddc_delay_file(file.path()).ddc_retry_count, DEFAULT_DDC_RETRY_COUNT);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddcDelay");
        assert!(matches!(read_ddc_retry_count(&path), Err(ConfigError::Io { .. })));
        assert_eq!(ControllerConfig::with_ddc_delay_file(&path).ddc_retry_count, DEFAULT_DDC_RETRY_COUNT);
    }
}
