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

//! Console commands that stand in for HAL callbacks in the simulated service.

use std::str::FromStr;

use log::{debug, warn};
use resmgr_core::{DisplayEvent, HdcpStatus, HotplugState, SimulatedPlatform, VideoPortType};
use tokio::sync::broadcast;

pub const HELP: &str = "commands: connect | disconnect | hdcp-ok | hdcp-fail | tune-ready | edid <A,B,...> | status | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Connect,
    Disconnect,
    HdcpOk,
    HdcpFail,
    TuneReady,
    /// Replace the resolutions advertised by the HDMI sink.
    Edid(Vec<String>),
    Status,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match command.to_lowercase().as_str() {
            "connect" => Ok(ConsoleCommand::Connect),
            "disconnect" => Ok(ConsoleCommand::Disconnect),
            "hdcp-ok" => Ok(ConsoleCommand::HdcpOk),
            "hdcp-fail" => Ok(ConsoleCommand::HdcpFail),
            "tune-ready" => Ok(ConsoleCommand::TuneReady),
            "edid" => Ok(ConsoleCommand::Edid(
                args.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            "status" => Ok(ConsoleCommand::Status),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            _ => Err(format!("Unknown command: {}", line)),
        }
    }
}

/// What the console loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console<'a> {
    platform: &'a SimulatedPlatform,
    events: &'a broadcast::Sender<DisplayEvent>,
}

impl<'a> Console<'a> {
    pub fn new(platform: &'a SimulatedPlatform, events: &'a broadcast::Sender<DisplayEvent>) -> Self {
        Self { platform, events }
    }

    pub fn execute(&self, command: ConsoleCommand) -> anyhow::Result<Flow> {
        debug!("Console command: {:?}", command);
        match command {
            ConsoleCommand::Connect => {
                self.platform.set_connected(VideoPortType::Hdmi, true);
                self.emit(DisplayEvent::Hotplug(HotplugState::Connected));
            }
            ConsoleCommand::Disconnect => {
                self.platform.set_connected(VideoPortType::Hdmi, false);
                self.emit(DisplayEvent::Hotplug(HotplugState::Disconnected));
            }
            ConsoleCommand::HdcpOk => self.emit(DisplayEvent::Hdcp(HdcpStatus::Authenticated)),
            ConsoleCommand::HdcpFail => self.emit(DisplayEvent::Hdcp(HdcpStatus::AuthenticationFailure)),
            ConsoleCommand::TuneReady => self.emit(DisplayEvent::TuneReady),
            ConsoleCommand::Edid(supported) => {
                self.platform.set_supported_resolutions(VideoPortType::Hdmi, supported);
            }
            ConsoleCommand::Status => self.print_status()?,
            ConsoleCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn emit(&self, event: DisplayEvent) {
        if self.events.send(event).is_err() {
            warn!("No orchestrator listening for {}", event);
        }
    }

    fn print_status(&self) -> anyhow::Result<()> {
        let profile = self.platform.profile();
        println!("{}", serde_json::to_string_pretty(&profile)?);
        for applied in self.platform.applied() {
            println!(
                "applied {} on {} force_compatible={}",
                applied.resolution, applied.port, applied.force_compatible
            );
        }
        Ok(())
    }
}
