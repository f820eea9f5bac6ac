//! Platform-independent core of Blackout: monitor identity, overlay
//! reconciliation, the foreground watch registry and settings persistence.

pub mod config;
pub mod display;
pub mod error;
pub mod foreground;
pub mod identity;
pub mod service;
pub mod surface;

pub use config::{AppConfig, JsonSettingsStore, Selection, SettingsStore};
pub use display::{Display, DisplayId, DisplayTopology, Rect};
pub use error::{BlackoutError, Result};
pub use foreground::{ForegroundWatch, HookBackend};
pub use identity::{DescriptorSource, MonitorDescriptor, MonitorIdentityResolver, StableKey};
pub use service::{BlackoutService, MonitorStatus};
pub use surface::{OverlaySurface, SurfaceFactory};
