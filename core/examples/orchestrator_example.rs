// Example showing how to wire SimulatedPlatform + ResolutionController + ResolutionOrchestrator
// and replay a boot: tune ready, HDMI hotplug, HDCP authentication, then an unplug.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;
use resmgr_core::{
    ControllerConfig, DisplayEvent, DisplayProfile, HdcpStatus, HotplugState, OrchestratorConfig, RegionMode,
    ResolutionController, ResolutionOrchestrator, SimulatedPlatform, VideoPortType,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut profile = DisplayProfile::hdmi_sink("1080p50", &["720p", "720p50", "1080i", "1080p60"]);
    profile.persisted.insert(VideoPortType::Component, "1080i50".to_string());
    let platform = Arc::new(SimulatedPlatform::new(profile));
    platform.set_port_available(VideoPortType::Component, true);

    let controller = Arc::new(ResolutionController::new(
        platform.clone(),
        platform.clone(),
        platform.clone(),
        RegionMode::Eu,
        ControllerConfig::default(),
    ));

    let (events_tx, events_rx) = tokio::sync::broadcast::channel(16);
    let config = OrchestratorConfig {
        disconnect_reapply_delay: Duration::from_millis(500),
        ..Default::default()
    };
    let orchestrator = ResolutionOrchestrator::new(events_rx, controller, config).run();

    let script = [
        DisplayEvent::TuneReady,
        DisplayEvent::Hotplug(HotplugState::Connected),
        DisplayEvent::Hdcp(HdcpStatus::Authenticated),
    ];
    for event in script {
        info!("-> {}", event);
        events_tx.send(event)?;
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    platform.set_connected(VideoPortType::Hdmi, false);
    events_tx.send(DisplayEvent::Hotplug(HotplugState::Disconnected))?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    for applied in platform.applied() {
        info!("applied {} on {} (force_compatible={})", applied.resolution, applied.port, applied.force_compatible);
    }
    orchestrator.shutdown().await?;
    Ok(())
}
