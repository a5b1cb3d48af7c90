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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugState {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdcpStatus {
    Authenticated,
    AuthenticationFailure,
}

/// Events emitted by the display HAL and the tuner that drive resolution changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// The system finished booting and is ready to tune. Only the first one counts.
    TuneReady,

    /// A display was attached to or detached from the HDMI port.
    Hotplug(HotplugState),

    /// HDCP handshake with the HDMI sink completed.
    Hdcp(HdcpStatus),
}

impl fmt::Display for DisplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayEvent::TuneReady => f.write_str("tune ready"),
            DisplayEvent::Hotplug(HotplugState::Connected) => f.write_str("HDMI hotplug: connected"),
            DisplayEvent::Hotplug(HotplugState::Disconnected) => f.write_str("HDMI hotplug: disconnected"),
            DisplayEvent::Hdcp(HdcpStatus::Authenticated) => f.write_str("HDCP authenticated"),
            DisplayEvent::Hdcp(HdcpStatus::AuthenticationFailure) => f.write_str("HDCP authentication failure"),
        }
    }
}
