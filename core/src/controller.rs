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

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::Error;
use log::{debug, error, info, warn};
use tokio::time::sleep;

use crate::config::ControllerConfig;
use crate::display::{BackgroundColor, DisplayQuery, PersistenceStore, ResolutionApplier, VideoPortType};
use crate::edid::{log_edid_info, EdidChecksumTracker};
use crate::errors::{ControllerError, DisplayError};
use crate::region::RegionMode;
use crate::resolution::ResolutionName;
use crate::selector::{ResolutionSelector, SelectionStep};

/// Result of one controller pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Applied {
        port: VideoPortType,
        resolution: String,
        force_compatible: bool,
        /// Selector step that produced the resolution; `None` on analog ports.
        step: Option<SelectionStep>,
    },
    /// The sink did not report a usable EDID; the next hotplug retries.
    DisplayNotReady { port: VideoPortType },
    NoResolution { port: VideoPortType },
    /// No video port handle was available.
    NoPort,
}

/// Operations the orchestrator drives on the video output side.
pub trait VideoPortControl: Send + Sync {
    /// Picks the active port and applies the best resolution to it.
    fn set_video_port_resolution<'a>(&'a self)
        -> Pin<Box<dyn Future<Output = Result<ResolutionOutcome, Error>> + Send + 'a>>;

    fn set_background_color<'a>(&'a self, color: BackgroundColor)
        -> Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

    fn is_hdmi_connected<'a>(&'a self)
        -> Pin<Box<dyn Future<Output = Result<bool, Error>> + Send + 'a>>;

    /// Reads the raw HDMI EDID and reports whether it changed since the previous dump.
    fn dump_edid<'a>(&'a self)
        -> Pin<Box<dyn Future<Output = Result<bool, Error>> + Send + 'a>>;
}

pub struct ResolutionController<D, A, P>
where
    D: DisplayQuery + 'static,
    A: ResolutionApplier + 'static,
    P: PersistenceStore + 'static,
{
    display: Arc<D>,
    applier: Arc<A>,
    persistence: Arc<P>,
    selector: ResolutionSelector,
    config: ControllerConfig,
    edid_tracker: Mutex<EdidChecksumTracker>,
}

impl<D, A, P> ResolutionController<D, A, P>
where
    D: DisplayQuery + 'static,
    A: ResolutionApplier + 'static,
    P: PersistenceStore + 'static,
{
    pub fn new(
        display: Arc<D>,
        applier: Arc<A>,
        persistence: Arc<P>,
        region: RegionMode,
        config: ControllerConfig,
    ) -> Self {
        Self {
            display,
            applier,
            persistence,
            selector: ResolutionSelector::new(region),
            config,
            edid_tracker: Mutex::new(EdidChecksumTracker::new()),
        }
    }

    pub fn selector(&self) -> &ResolutionSelector {
        &self.selector
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// HDMI when a display is attached to it, otherwise the first available analog port.
    pub async fn set_video_port_resolution(&self) -> Result<ResolutionOutcome, ControllerError> {
        if !self.display.is_port_available(VideoPortType::Hdmi).await? {
            info!("No handle for HDMI port");
            return Ok(ResolutionOutcome::NoPort);
        }

        sleep(self.config.connect_settle_delay).await;
        if self.display.is_display_connected(VideoPortType::Hdmi).await? {
            self.wait_for_ddc_line().await?;
            info!("Setting HDMI resolution");
            return self.set_resolution(VideoPortType::Hdmi).await;
        }

        for port in VideoPortType::ANALOG_PRIORITY {
            if self.display.is_port_available(port).await? {
                info!("Setting {} resolution", port);
                return self.set_resolution(port).await;
            }
            debug!("No handle for {} port", port);
        }
        info!("No video port available for resolution change");
        Ok(ResolutionOutcome::NoPort)
    }

    pub async fn set_resolution(&self, port: VideoPortType) -> Result<ResolutionOutcome, ControllerError> {
        let persisted = self
            .persistence
            .persisted_resolution(port)
            .await
            .map_err(ControllerError::Persistence)?;
        info!("Persisted resolution for {} is {}", port, persisted);
        if let Err(e) = persisted.parse::<ResolutionName>() {
            warn!("Persisted resolution for {} is not a known name: {}", port, e);
        }

        let (mut resolution, force_compatible, step) = if port == VideoPortType::Hdmi {
            let edid = self.display.edid(port).await?;
            log_edid_info(&edid);
            if !edid.is_ready() {
                error!("EDID not ready (display in low power or DVI mode); waiting for next hotplug");
                return Ok(ResolutionOutcome::DisplayNotReady { port });
            }
            match self.selector.select(&persisted, &edid.supported_resolutions) {
                Some(decision) => (decision.resolution, decision.force_compatible, Some(decision.step)),
                None => {
                    warn!("No resolution available for {}", port);
                    return Ok(ResolutionOutcome::NoResolution { port });
                }
            }
        } else if self.config.platform_resolutions.iter().any(|r| *r == persisted) {
            (persisted.clone(), false, None)
        } else {
            info!("{} is not a platform resolution; using {}", persisted, self.config.platform_default);
            (self.config.platform_default.clone(), false, None)
        };

        if persisted.starts_with("2160")
            && self.persistence.is_4k_disabled().await.map_err(ControllerError::Persistence)?
        {
            info!("4K output disabled; replacing {} with {}", resolution, self.config.platform_default);
            resolution = self.config.platform_default.clone();
        }

        info!("Setting {} resolution to {} (force_compatible={})", port, resolution, force_compatible);
        self.applier
            .apply(port, &resolution, force_compatible)
            .await
            .map_err(|source| ControllerError::Apply {
                port,
                resolution: resolution.clone(),
                source,
            })?;

        Ok(ResolutionOutcome::Applied { port, resolution, force_compatible, step })
    }

    /// Polls the DDC line until ready or out of retries. Returns whether it became ready.
    async fn wait_for_ddc_line(&self) -> Result<bool, ControllerError> {
        for attempt in 0..self.config.ddc_retry_count {
            if self.display.is_ddc_line_ready(VideoPortType::Hdmi).await? {
                debug!("HDMI DDC line ready after {} polls", attempt);
                return Ok(true);
            }
            info!("Waiting for HDMI DDC line ({}/{})", attempt + 1, self.config.ddc_retry_count);
            sleep(self.config.ddc_poll_interval).await;
        }
        warn!("HDMI DDC line not ready after {} polls; continuing", self.config.ddc_retry_count);
        Ok(false)
    }

    pub async fn dump_hdmi_edid(&self) -> Result<bool, ControllerError> {
        if !self.display.is_port_available(VideoPortType::Hdmi).await? {
            return Ok(false);
        }
        let bytes = self.display.edid_bytes(VideoPortType::Hdmi).await?;
        let mut tracker = self
            .edid_tracker
            .lock()
            .map_err(|_| DisplayError::Hal("EDID tracker lock poisoned".into()))?;
        Ok(tracker.update(&bytes))
    }
}

impl<D, A, P> VideoPortControl for ResolutionController<D, A, P>
where
    D: DisplayQuery + 'static,
    A: ResolutionApplier + 'static,
    P: PersistenceStore + 'static,
{
    fn set_video_port_resolution<'a>(&'a self)
        -> Pin<Box<dyn Future<Output = Result<ResolutionOutcome, Error>> + Send + 'a>> {
        Box::pin(async move { Ok(ResolutionController::set_video_port_resolution(self).await?) })
    }

    fn set_background_color<'a>(&'a self, color: BackgroundColor)
        -> Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>> {
        Box::pin(async move {
            if !self.display.is_port_available(VideoPortType::Hdmi).await? {
                return Ok(());
            }
            self.applier.set_background_color(VideoPortType::Hdmi, color).await
        })
    }

    fn is_hdmi_connected<'a>(&'a self)
        -> Pin<Box<dyn Future<Output = Result<bool, Error>> + Send + 'a>> {
        Box::pin(async move {
            if !self.display.is_port_available(VideoPortType::Hdmi).await? {
                return Ok(false);
            }
            Ok(self.display.is_display_connected(VideoPortType::Hdmi).await?)
        })
    }

    fn dump_edid<'a>(&'a self)
        -> Pin<Box<dyn Future<Output = Result<bool, Error>> + Send + 'a>> {
        Box::pin(async move { Ok(self.dump_hdmi_edid().await?) })
    }
}
