//! Timeshift Engine - delayed playback scheduling and lifecycle
//!
//! Architecture:
//! - `DelayScheduler`: per-element state machine holding the initial,
//!   in-flight and delayed frames and the matching caption snapshots
//! - `TimingStrategy`: frame-count or wall-clock delay measurement
//! - `PromotionQueue`: in-flight items promoted once their delay elapsed
//! - `Monitor`: discovers elements, applies settings, forwards host callbacks
//!
//! Everything runs inside host callbacks (`on_refresh`, `on_decoded_frame`);
//! the engine never spawns threads or blocks.

pub mod media;
pub mod monitor;
pub mod overlay;
pub mod promotion;
pub mod scheduler;
pub mod settings;
pub mod teardown;
pub mod timing;


pub use media::{MediaElement, MediaKind};
pub use monitor::{Monitor, Platform, Scheduler};
pub use overlay::{ElementLayout, OverlayPlacement, OverlayPlan, SurfaceKind};
pub use promotion::{Due, PromotionQueue};
pub use scheduler::{Countdown, CountdownKind, DelayScheduler, Phase, SchedulerStats};
pub use settings::{
    default_config_path, ConfigFile, DelayMode, EngineConfig, Settings, SettingsMessage,
};
pub use teardown::Teardown;
pub use timing::{Mark, RefreshSampler, TimingPolicy, TimingStrategy};
