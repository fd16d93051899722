//! Timeshift Subtitles - caption extraction and delayed rendering
//!
//! Native captions are sampled from the host document on every decoded
//! frame, queued alongside the video frames, and painted onto a separate
//! overlay once the same delay has elapsed.
//!
//! Supported sources:
//! - inline-markup cues with bold/italic/underline tags
//! - segmented roll-up caption windows
//! - segmented bottom-anchored caption windows

pub mod layout;
pub mod line;
pub mod markup;
pub mod pipeline;
pub mod source;

pub use layout::{
    layout, paint, FontSpec, Metrics, Rgba, SubtitleLayout, SubtitlePainter, TextMeasure,
};
pub use line::{logical_lines, StyleFlags, SubtitleLine, SubtitleSnapshot};
pub use pipeline::SubtitlePipeline;
pub use source::{
    CaptionDocument, CaptionElement, CaptionFormat, CaptionNodeId, CaptionSource, InlineStyle,
};
