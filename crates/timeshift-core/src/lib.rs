//! Timeshift Core - Foundation types for delayed playback
//!
//! This crate provides the types shared by every Timeshift crate:
//! - Host clock timestamps and clamped delay values
//! - Texture handles, captured frames and decoded images
//! - Media element identity and overlay geometry
//! - The common error type

pub mod element;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod time;

pub use element::ElementId;
pub use error::{Result, TimeshiftError};
pub use frame::{DecodedImage, Frame, PixelFormat, ProgramHandle, SharedImage, TextureHandle};
pub use geometry::{Rect, Transform2D, Vec2};
pub use time::{Delay, Timestamp, TimingMode};

/// Engine limits and tunables shared across crates.
pub mod limits {
    use std::time::Duration;

    /// Idle textures kept per pool; extra releases are destroyed.
    pub const POOL_CAPACITY: usize = 4;

    /// Longest delay accepted by video and audio paths (2 minutes).
    pub const MAX_DELAY_MS: u64 = 120_000;

    /// Refresh interval assumed when converting a delay into a refresh count.
    pub const NOMINAL_REFRESH_INTERVAL: Duration = Duration::from_micros(16_667);

    /// Average refresh interval below which the display counts as high refresh rate.
    pub const HIGH_REFRESH_THRESHOLD: Duration = Duration::from_millis(14);

    /// Number of refresh intervals in the rolling cadence sample.
    pub const REFRESH_SAMPLE_SIZE: usize = 10;

    /// How long detached GPU resources wait for in-flight draws before deletion.
    pub const DRAIN_BOUND: Duration = Duration::from_millis(34);
}
