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

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::select;
use tokio::sync::broadcast;
use tokio::time::{sleep_until, Instant};

use crate::config::OrchestratorConfig;
use crate::controller::{ResolutionOutcome, VideoPortControl};
use crate::display::BackgroundColor;
use crate::display_events::{DisplayEvent, HdcpStatus, HotplugState};
use crate::service::{spawn_service, ServiceHandle, StopHandle};

/// Orchestrator subscribes to display events and decides when the video port
/// resolution is renegotiated. Delayed work (re-apply after an HDMI disconnect,
/// EDID dump after an HDCP status change) is kept as deadlines in the same task,
/// so controller passes never overlap. Every HDCP status change queues its own
/// EDID dump.
pub struct ResolutionOrchestrator<C: VideoPortControl> {
    event_rx: broadcast::Receiver<DisplayEvent>,
    control: Arc<C>,
    config: OrchestratorConfig,

    tune_ready: bool,
    /// Last HDMI hotplug event; `None` until the first one arrives.
    last_hotplug: Option<HotplugState>,
    hdcp_authenticated: bool,
    bootup: bool,

    reapply_at: Option<Instant>,
    edid_dumps: VecDeque<Instant>,
}

impl<C: VideoPortControl + 'static> ResolutionOrchestrator<C> {
    pub fn new(event_rx: broadcast::Receiver<DisplayEvent>, control: Arc<C>, config: OrchestratorConfig) -> Self {
        let tune_ready = config.tune_ready_at_start;
        Self {
            event_rx,
            control,
            config,
            tune_ready,
            last_hotplug: None,
            hdcp_authenticated: false,
            bootup: true,
            reapply_at: None,
            edid_dumps: VecDeque::new(),
        }
    }

    /// Spawn the orchestrator event loop in background and return a handle.
    pub fn run(self) -> ServiceHandle {
        spawn_service(move |stop| self.event_loop(stop))
    }

    async fn event_loop(mut self, mut stop: StopHandle) {
        let hdmi_connected = match self.control.is_hdmi_connected().await {
            Ok(connected) => connected,
            Err(e) => {
                warn!("Failed to query HDMI connection: {}", e);
                false
            }
        };
        if !hdmi_connected {
            info!("HDMI not connected at start; configuring analog output");
            self.run_controller().await;
        }

        loop {
            let reapply_at = self.reapply_at;
            let edid_dump_at = self.edid_dumps.front().copied();
            select! {
                biased;
                _ = stop.signaled() => {
                    info!("Resolution orchestrator shutdown requested");
                    break;
                }
                recv_res = self.event_rx.recv() => {
                    match recv_res {
                        Ok(evt) => self.on_display_event(evt).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("DisplayEvent lagged by {} messages; catching up", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("DisplayEvent channel closed; stopping orchestrator");
                            break;
                        }
                    }
                }
                _ = sleep_until(reapply_at.unwrap_or_else(Instant::now)), if reapply_at.is_some() => {
                    self.reapply_at = None;
                    info!("Re-applying resolution after HDMI disconnect");
                    self.run_controller().await;
                }
                _ = sleep_until(edid_dump_at.unwrap_or_else(Instant::now)), if edid_dump_at.is_some() => {
                    self.edid_dumps.pop_front();
                    self.dump_edid().await;
                }
            }
        }
    }

    async fn on_display_event(&mut self, evt: DisplayEvent) {
        debug!("Display event: {}", evt);
        match evt {
            DisplayEvent::TuneReady => self.handle_tune_ready().await,
            DisplayEvent::Hotplug(state) => self.handle_hotplug(state).await,
            DisplayEvent::Hdcp(HdcpStatus::Authenticated) => self.handle_hdcp_authenticated().await,
            DisplayEvent::Hdcp(HdcpStatus::AuthenticationFailure) => self.handle_hdcp_failure().await,
        }
    }

    async fn handle_tune_ready(&mut self) {
        if self.tune_ready {
            return;
        }
        self.tune_ready = true;
        self.evaluate().await;
    }

    async fn handle_hotplug(&mut self, state: HotplugState) {
        self.set_background(BackgroundColor::None).await;
        self.last_hotplug = Some(state);
        self.evaluate().await;
    }

    async fn handle_hdcp_authenticated(&mut self) {
        self.hdcp_authenticated = true;
        self.reapply_at = None;
        self.set_background(BackgroundColor::None).await;
        if !self.config.ignore_edid || self.bootup {
            self.run_controller().await;
        }
        self.bootup = false;
        self.schedule_edid_dump();
    }

    async fn handle_hdcp_failure(&mut self) {
        self.hdcp_authenticated = false;
        self.set_background(BackgroundColor::Blue).await;
        if !self.config.ignore_edid {
            self.run_controller().await;
        }
        self.schedule_edid_dump();
    }

    async fn evaluate(&mut self) {
        self.reapply_at = None;
        if !self.tune_ready {
            debug!("Not tune ready yet; deferring resolution change");
            return;
        }
        match self.last_hotplug {
            Some(HotplugState::Connected) => {
                if self.hdcp_authenticated {
                    self.run_controller().await;
                }
            }
            Some(HotplugState::Disconnected) => {
                self.hdcp_authenticated = false;
                self.reapply_at = Some(Instant::now() + self.config.disconnect_reapply_delay);
            }
            None => debug!("No HDMI hotplug event yet; nothing to renegotiate"),
        }
    }

    fn schedule_edid_dump(&mut self) {
        self.edid_dumps.push_back(Instant::now() + self.config.edid_dump_delay);
    }

    async fn run_controller(&self) {
        match self.control.set_video_port_resolution().await {
            Ok(ResolutionOutcome::Applied { port, resolution, .. }) => {
                info!("Resolution {} applied to {}", resolution, port);
            }
            Ok(outcome) => info!("No resolution change: {:?}", outcome),
            Err(e) => warn!("Failed to set video port resolution: {:#}", e),
        }
    }

    async fn set_background(&self, color: BackgroundColor) {
        if let Err(e) = self.control.set_background_color(color).await {
            warn!("Failed to set background color {:?}: {}", color, e);
        }
    }

    async fn dump_edid(&self) {
        match self.control.dump_edid().await {
            Ok(true) => info!("HDMI EDID changed"),
            Ok(false) => debug!("HDMI EDID unchanged"),
            Err(e) => warn!("Failed to dump HDMI EDID: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Error;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        SetResolution,
        Background(BackgroundColor),
        DumpEdid,
    }

    struct MockControl {
        connected: Mutex<bool>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockControl {
        fn new(connected: bool) -> Arc<Self> {
            Arc::new(Self { connected: Mutex::new(connected), calls: Mutex::new(Vec::new()) })
        }
        fn take(&self) -> Vec<Call> { std::mem::take(&mut self.calls.lock().unwrap()) }
        fn resolution_calls(&self) -> usize {
            self.take().into_iter().filter(|c| *c == Call::SetResolution).count()
        }
    }

    impl VideoPortControl for MockControl {
        fn set_video_port_resolution<'a>(&'a self)
            -> Pin<Box<dyn Future<Output = Result<ResolutionOutcome, Error>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(Call::SetResolution);
                Ok(ResolutionOutcome::NoPort)
            })
        }

        fn set_background_color<'a>(&'a self, color: BackgroundColor)
            -> Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(Call::Background(color));
                Ok(())
            })
        }

        fn is_hdmi_connected<'a>(&'a self)
            -> Pin<Box<dyn Future<Output = Result<bool, Error>> + Send + 'a>> {
            Box::pin(async move { Ok(*self.connected.lock().unwrap()) })
        }

        fn dump_edid<'a>(&'a self)
            -> Pin<Box<dyn Future<Output = Result<bool, Error>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(Call::DumpEdid);
                Ok(false)
            })
        }
    }

    fn test_config() -> OrchestratorConfig {
        OrchestratorConfig {
            disconnect_reapply_delay: Duration::from_millis(100),
            edid_dump_delay: Duration::from_millis(30),
            ..Default::default()
        }
    }

    fn start(
        control: Arc<MockControl>,
        config: OrchestratorConfig,
    ) -> (ServiceHandle, broadcast::Sender<DisplayEvent>) {
        let (tx, rx) = broadcast::channel(64);
        let handle = ResolutionOrchestrator::new(rx, control, config).run();
        (handle, tx)
    }

    async fn short_wait() { sleep(Duration::from_millis(10)).await }

    #[tokio::test]
    async fn analog_output_configured_at_start() {
        let control = MockControl::new(false);
        let (handle, _tx) = start(control.clone(), test_config());
        short_wait().await;
        assert_eq!(control.take(), vec![Call::SetResolution]);
        let _ = handle.shutdown().await;
    }

    #[tokio::test]
    async fn hotplug_before_tune_ready_does_not_apply() {
        let control = MockControl::new(true);
        let (handle, tx) = start(control.clone(), test_config());
        let _ = tx.send(DisplayEvent::Hotplug(HotplugState::Disconnected));
        let _ = tx.send(DisplayEvent::Hotplug(HotplugState::Connected));
        sleep(Duration::from_millis(150)).await;
        assert_eq!(
            control.take(),
            vec![Call::Background(BackgroundColor::None), Call::Background(BackgroundColor::None)]
        );
        let _ = handle.shutdown().await;
    }

    #[tokio::test]
    async fn connect_applies_once_hdcp_authenticated() {
        let control = MockControl::new(true);
        let (handle, tx) = start(control.clone(), test_config());
        let _ = tx.send(DisplayEvent::TuneReady);
        let _ = tx.send(DisplayEvent::Hotplug(HotplugState::Connected));
        short_wait().await;
        assert_eq!(control.resolution_calls(), 0);

        let _ = tx.send(DisplayEvent::Hdcp(HdcpStatus::Authenticated));
        short_wait().await;
        assert_eq!(control.take(), vec![Call::Background(BackgroundColor::None), Call::SetResolution]);

        sleep(Duration::from_millis(40)).await;
        assert_eq!(control.take(), vec![Call::DumpEdid]);

        // Authenticated sink re-plugged: renegotiate on hotplug.
        let _ = tx.send(DisplayEvent::Hotplug(HotplugState::Connected));
        short_wait().await;
        assert_eq!(control.resolution_calls(), 1);
        let _ = handle.shutdown().await;
    }

    #[tokio::test]
    async fn tune_ready_counts_once() {
        let control = MockControl::new(false);
        let config = OrchestratorConfig { disconnect_reapply_delay: Duration::from_millis(20), ..test_config() };
        let (handle, tx) = start(control.clone(), config);
        short_wait().await;
        control.take();

        // No hotplug seen yet: tune ready alone does not renegotiate.
        let _ = tx.send(DisplayEvent::TuneReady);
        sleep(Duration::from_millis(40)).await;
        assert_eq!(control.resolution_calls(), 0);

        let _ = tx.send(DisplayEvent::Hotplug(HotplugState::Disconnected));
        sleep(Duration::from_millis(40)).await;
        assert_eq!(control.resolution_calls(), 1);

        let _ = tx.send(DisplayEvent::TuneReady);
        sleep(Duration::from_millis(40)).await;
        assert_eq!(control.resolution_calls(), 0);
        let _ = handle.shutdown().await;
    }

    #[tokio::test]
    async fn tune_ready_after_boot_authentication_applies_once() {
        let control = MockControl::new(true);
        let (handle, tx) = start(control.clone(), test_config());
        let _ = tx.send(DisplayEvent::Hdcp(HdcpStatus::Authenticated));
        sleep(Duration::from_millis(20)).await;
        let _ = tx.send(DisplayEvent::TuneReady);
        sleep(Duration::from_millis(150)).await;
        assert_eq!(control.resolution_calls(), 1);
        let _ = handle.shutdown().await;
    }

    #[tokio::test]
    async fn each_hdcp_change_dumps_edid() {
        let control = MockControl::new(true);
        let (handle, tx) = start(control.clone(), test_config());
        let _ = tx.send(DisplayEvent::Hdcp(HdcpStatus::AuthenticationFailure));
        sleep(Duration::from_millis(10)).await;
        let _ = tx.send(DisplayEvent::Hdcp(HdcpStatus::Authenticated));
        sleep(Duration::from_millis(80)).await;
        let dumps = control.take().into_iter().filter(|c| *c == Call::DumpEdid).count();
        assert_eq!(dumps, 2);
        let _ = handle.shutdown().await;
    }

    #[tokio::test]
    async fn reconnect_cancels_delayed_reapply() {
        let control = MockControl::new(true);
        let config = OrchestratorConfig { tune_ready_at_start: true, ..test_config() };
        let (handle, tx) = start(control.clone(), config);

        let _ = tx.send(DisplayEvent::Hotplug(HotplugState::Disconnected));
        sleep(Duration::from_millis(30)).await;
        let _ = tx.send(DisplayEvent::Hotplug(HotplugState::Connected));
        sleep(Duration::from_millis(150)).await;
        assert_eq!(control.resolution_calls(), 0);

        let _ = tx.send(DisplayEvent::Hotplug(HotplugState::Disconnected));
        sleep(Duration::from_millis(30)).await;
        assert_eq!(control.resolution_calls(), 0);
        sleep(Duration::from_millis(120)).await;
        assert_eq!(control.resolution_calls(), 1);
        let _ = handle.shutdown().await;
    }

    #[tokio::test]
    async fn ignore_edid_applies_on_first_authentication_only() {
        let control = MockControl::new(true);
        let config = OrchestratorConfig { ignore_edid: true, ..test_config() };
        let (handle, tx) = start(control.clone(), config);

        let _ = tx.send(DisplayEvent::Hdcp(HdcpStatus::Authenticated));
        short_wait().await;
        assert_eq!(control.resolution_calls(), 1);

        let _ = tx.send(DisplayEvent::Hdcp(HdcpStatus::Authenticated));
        short_wait().await;
        assert_eq!(control.resolution_calls(), 0);

        let _ = tx.send(DisplayEvent::Hdcp(HdcpStatus::AuthenticationFailure));
        short_wait().await;
        assert_eq!(control.take(), vec![Call::Background(BackgroundColor::Blue)]);
        let _ = handle.shutdown().await;
    }

    #[tokio::test]
    async fn hdcp_failure_sets_blue_background_and_applies() {
        let control = MockControl::new(true);
        let (handle, tx) = start(control.clone(), test_config());
        let _ = tx.send(DisplayEvent::Hdcp(HdcpStatus::AuthenticationFailure));
        sleep(Duration::from_millis(50)).await;
        assert_eq!(
            control.take(),
            vec![Call::Background(BackgroundColor::Blue), Call::SetResolution, Call::DumpEdid]
        );
        let _ = handle.shutdown().await;
    }

    #[tokio::test]
    async fn closed_channel_stops_orchestrator() {
        let control = MockControl::new(true);
        let (handle, tx) = start(control, test_config());
        drop(tx);
        assert!(handle.await_join().await.is_ok());
    }
}
