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

mod cli;
mod console;
mod logger;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{debug, error, info};
use resmgr_core::{
    select_resolution, ControllerConfig, DevicePropertiesRegion, DisplayProfile, OrchestratorConfig,
    PersistenceStore, PlatformRegion, ResolutionController, ResolutionOrchestrator, SimulatedPlatform,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::cli::{Cli, Commands};
use crate::console::{Console, ConsoleCommand, Flow};
use crate::logger::init_logger;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Err(e) = init_logger(cli.log_file.as_deref(), cli.log_level) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    match cli.command {
        Commands::Select { persisted, supported, eu } => {
            run_select(&persisted, &supported, eu);
            Ok(())
        }
        Commands::Run { profile, device_properties, ddc_delay } => {
            run_simulation(&profile, &device_properties, &ddc_delay).await
        }
    }
}

fn run_select(persisted: &str, supported: &[String], eu: bool) {
    let supported: Vec<&str> = supported.iter().map(String::as_str).filter(|s| !s.is_empty()).collect();
    match select_resolution(persisted, &supported, eu) {
        Some(decision) => println!(
            "{} force_compatible={} step={}",
            decision.resolution, decision.force_compatible, decision.step
        ),
        None => println!("no decision"),
    }
}

async fn run_simulation(profile_path: &Path, device_properties: &Path, ddc_delay: &Path) -> anyhow::Result<()> {
    let profile = DisplayProfile::from_file(profile_path)
        .with_context(|| format!("Failed to load display profile {}", profile_path.display()))?;
    let region = DevicePropertiesRegion::new(device_properties).region_mode();
    info!("Platform region is {}", region);

    let platform = Arc::new(SimulatedPlatform::new(profile));
    let orchestrator_config = OrchestratorConfig {
        ignore_edid: platform.ignore_edid().await?,
        ..Default::default()
    };
    let controller = Arc::new(ResolutionController::new(
        platform.clone(),
        platform.clone(),
        platform.clone(),
        region,
        ControllerConfig::with_ddc_delay_file(ddc_delay),
    ));

    let (events_tx, events_rx) = broadcast::channel(64);
    debug!("Starting resolution orchestrator");
    let orchestrator = ResolutionOrchestrator::new(events_rx, controller, orchestrator_config).run();

    println!("{}", console::HELP);
    let console = Console::new(&platform, &events_tx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C signal, exiting...");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("Console input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<ConsoleCommand>() {
            Ok(command) => {
                if console.execute(command)? == Flow::Quit {
                    break;
                }
            }
            Err(e) => {
                error!("{}", e);
                println!("{}", console::HELP);
            }
        }
    }

    debug!("Shutting down resolution orchestrator");
    orchestrator.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_profile_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("profiles").join("eu_tv.json");
        let profile = DisplayProfile::from_file(path).unwrap();
        assert!(profile.ports.contains_key(&resmgr_core::VideoPortType::Hdmi));
        assert_eq!(profile.persisted[&resmgr_core::VideoPortType::Hdmi], "1080p50");
    }
}
