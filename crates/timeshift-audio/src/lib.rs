//! Timeshift Audio - per-element delay/bypass routing
//!
//! Architecture:
//! - `DelayLine`: circular sample buffer with a resizable latency
//! - `AudioRoute`: wet (delayed) and dry (bypass) paths behind a crossfade
//! - `AudioDelayGraph`: one route per media element
//! - `AudioOutput`: cpal sink fed through a shared sample queue

pub mod delay_line;
pub mod graph;
pub mod output;
pub mod route;

pub use delay_line::DelayLine;
pub use graph::AudioDelayGraph;
pub use output::{AudioOutput, SampleQueue};
pub use route::{AudioRoute, Crossfade};
