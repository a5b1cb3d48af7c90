pub mod config;
pub mod controller;
pub mod display;
pub mod display_events;
pub mod edid;
pub mod errors;
pub mod fallback_table;
pub mod orchestrator;
pub mod region;
pub mod resolution;
pub mod selector;
pub mod simulated;

mod service;

pub use config::{ControllerConfig, OrchestratorConfig};
pub use controller::{ResolutionController, ResolutionOutcome, VideoPortControl};
pub use display::{BackgroundColor, DisplayEdid, DisplayQuery, PersistenceStore, ResolutionApplier, VideoPortType};
pub use display_events::{DisplayEvent, HdcpStatus, HotplugState};
pub use fallback_table::{build_fallback_table, FallbackTable};
pub use orchestrator::ResolutionOrchestrator;
pub use region::{DevicePropertiesRegion, FixedRegion, PlatformRegion, RegionMode};
pub use resolution::{ResolutionBase, ResolutionName};
pub use selector::{select_resolution, ResolutionDecision, ResolutionSelector, SelectionStep};
pub use service::{spawn_service, ServiceHandle, StopHandle};
pub use simulated::{DisplayProfile, SimulatedPlatform};
