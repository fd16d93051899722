//! Subtitle segments and logical lines.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Inline style of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StyleFlags {
    pub bold: bool,
    pub italic: bool,
    pub underlined: bool,
}

impl StyleFlags {
    pub const PLAIN: Self = Self {
        bold: false,
        italic: false,
        underlined: false,
    };
}

/// One styled run of caption text.
///
/// A segment with `line_start` begins a new logical line; the others
/// continue the line before them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubtitleLine {
    pub text: String,
    pub line_start: bool,
    pub style: StyleFlags,
}

impl SubtitleLine {
    pub fn new(text: impl Into<String>, line_start: bool, style: StyleFlags) -> Self {
        Self {
            text: text.into(),
            line_start,
            style,
        }
    }

    /// Unstyled segment.
    pub fn plain(text: impl Into<String>, line_start: bool) -> Self {
        Self::new(text, line_start, StyleFlags::PLAIN)
    }
}

/// Immutable extraction result, shared between the current and delayed slots.
pub type SubtitleSnapshot = Arc<[SubtitleLine]>;

/// Segments of one displayed line.
pub type LogicalLine<'a> = SmallVec<[&'a SubtitleLine; 4]>;

/// Group segments into display lines at `line_start` boundaries.
///
/// A leading segment without `line_start` still opens the first line.
pub fn logical_lines(segments: &[SubtitleLine]) -> Vec<LogicalLine<'_>> {
    let mut lines: Vec<LogicalLine<'_>> = Vec::new();
    for segment in segments {
        match lines.last_mut() {
            Some(line) if !segment.line_start => line.push(segment),
            _ => {
                let mut line = LogicalLine::new();
                line.push(segment);
                lines.push(line);
            }
        }
    }
    lines
}

/// Keep only the last `keep` logical lines.
pub fn retain_last_lines(segments: Vec<SubtitleLine>, keep: usize) -> Vec<SubtitleLine> {
    if keep == 0 {
        return Vec::new();
    }
    let starts: Vec<usize> = segments
        .iter()
        .enumerate()
        .filter(|(i, s)| s.line_start || *i == 0)
        .map(|(i, _)| i)
        .collect();
    if starts.len() <= keep {
        return segments;
    }
    let from = starts[starts.len() - keep];
    let mut segments = segments;
    segments.drain(..from);
    segments
}
