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

use log::info;

use crate::display::DisplayEdid;

pub const EDID_BLOCK_LEN: usize = 128;
pub const EDID_MAX_LEN: usize = 512;

pub fn log_edid_info(edid: &DisplayEdid) {
    info!("Connected HDMI display device info");
    if let Some(name) = &edid.monitor_name {
        info!("HDMI monitor name is {}", name);
    }
    info!("HDMI manufacturing ID is {}", edid.manufacturer_id);
    info!("HDMI product code is {}", edid.product_code);
    info!("HDMI device type is {}", if edid.hdmi_device_type { "HDMI" } else { "DVI" });
    info!("HDMI sink device {} a repeater", if edid.is_repeater { "is" } else { "is not" });
    info!("HDMI physical address is {}", edid.physical_address);
    info!("HDMI supported resolutions: {:?}", edid.supported_resolutions);
}

/// Sum of the checksum byte (last byte) of every complete 128-byte block.
///
/// Returns `None` for an empty or oversized EDID.
pub fn edid_checksum(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > EDID_MAX_LEN {
        return None;
    }
    Some(
        bytes
            .chunks_exact(EDID_BLOCK_LEN)
            .map(|block| block[EDID_BLOCK_LEN - 1] as u32)
            .sum(),
    )
}

/// Remembers the last seen EDID checksum so that sink changes can be logged once.
#[derive(Debug, Default)]
pub struct EdidChecksumTracker {
    cached: Option<u32>,
}

impl EdidChecksumTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the EDID differs from the previous one, or none was seen yet.
    pub fn update(&mut self, bytes: &[u8]) -> bool {
        let Some(current) = edid_checksum(bytes) else {
            return false;
        };
        if self.cached == Some(current) {
            return false;
        }
        self.cached = Some(current);
        info!("HDMI EDID dump detected changes (checksum {})", current);
        true
    }

    pub fn cached(&self) -> Option<u32> {
        self.cached
    }
}
