//! Delayed subtitle layout and painting.
//!
//! Coordinates are CSS pixels of the overlay box; the painter applies the
//! device pixel ratio. Lines stack upward from a baseline at 86.5% of the
//! overlay height and are centred horizontally, each on a translucent
//! backing rectangle.

use crate::line::{logical_lines, StyleFlags, SubtitleLine};
use timeshift_core::{Rect, Vec2};

/// Baseline of the last line, as a fraction of overlay height.
pub const BASELINE_RATIO: f32 = 0.865;
/// Font size as a fraction of overlay height.
pub const FONT_RATIO: f32 = 0.04;
/// Smallest font size in pixels.
pub const MIN_FONT_PX: u32 = 12;
pub const PADDING_RATIO: f32 = 0.3;
pub const LINE_SPACING_RATIO: f32 = 1.13;
/// Underline offset below the line centre, as a fraction of font size.
pub const UNDERLINE_RATIO: f32 = 0.34;
pub const UNDERLINE_WIDTH_RATIO: f32 = 0.05;
/// Nudge applied to the text's vertical centre, as a fraction of overlay height.
pub const TEXT_NUDGE_RATIO: f32 = 0.0025;

pub const BACKGROUND: Rgba = Rgba::new(0, 0, 0, 0.5);
pub const TEXT_COLOR: Rgba = Rgba::new(255, 255, 255, 1.0);

/// Colour with a fractional alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Font of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontSpec {
    pub size_px: u32,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    pub fn for_style(size_px: u32, style: StyleFlags) -> Self {
        Self {
            size_px,
            bold: style.bold,
            italic: style.italic,
        }
    }

    /// CSS font shorthand.
    pub fn css(&self) -> String {
        let mut font = String::new();
        if self.italic {
            font.push_str("italic ");
        }
        if self.bold {
            font.push_str("bold ");
        }
        font.push_str(&format!("{}px Helvetica, sans-serif", self.size_px));
        font
    }
}

/// Text width measurement.
pub trait TextMeasure {
    fn measure(&self, text: &str, font: &FontSpec) -> f32;
}

/// 2D drawing surface for subtitles.
pub trait SubtitlePainter: TextMeasure {
    /// Erase everything.
    fn clear(&mut self);

    fn fill_rect(&mut self, rect: Rect, color: Rgba);

    /// Draw text with its left edge at `origin.x`, vertically centred on `origin.y`.
    fn fill_text(&mut self, text: &str, origin: Vec2, font: &FontSpec, color: Rgba);

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgba);
}

/// Font metrics derived from the overlay height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub baseline: f32,
    pub font_px: u32,
    pub padding: f32,
    pub line_spacing: f32,
}

impl Metrics {
    pub fn for_height(height: f32) -> Self {
        let font_px = ((height * FONT_RATIO).round() as u32).max(MIN_FONT_PX);
        let font = font_px as f32;
        let padding = (font * PADDING_RATIO).round();
        Self {
            baseline: (height * BASELINE_RATIO).round(),
            font_px,
            padding,
            line_spacing: ((font + padding) * LINE_SPACING_RATIO).round(),
        }
    }
}

/// A segment placed on its line.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSegment {
    pub text: String,
    pub origin: Vec2,
    pub width: f32,
    pub font: FontSpec,
    /// Underline endpoints and stroke width.
    pub underline: Option<(Vec2, Vec2, f32)>,
}

/// One logical line with its backing rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub center_y: f32,
    pub background: Rect,
    pub segments: Vec<PlacedSegment>,
}

/// Everything needed to paint one subtitle frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLayout {
    pub metrics: Metrics,
    pub lines: Vec<PlacedLine>,
}

impl SubtitleLayout {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Lay out `segments` in an overlay of `width` x `height` CSS pixels.
pub fn layout<M: TextMeasure + ?Sized>(
    segments: &[SubtitleLine],
    width: f32,
    height: f32,
    measure: &M,
) -> SubtitleLayout {
    let metrics = Metrics::for_height(height);
    let font = metrics.font_px as f32;
    let pad = metrics.padding;
    let groups = logical_lines(segments);
    let count = groups.len();

    let lines = groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let center_y = (metrics.baseline - (count - 1 - index) as f32 * metrics.line_spacing).round();

            let measured: Vec<(FontSpec, f32)> = group
                .iter()
                .map(|segment| {
                    let face = FontSpec::for_style(metrics.font_px, segment.style);
                    (face, measure.measure(&segment.text, &face).round())
                })
                .collect();
            let total: f32 = measured.iter().map(|(_, w)| w).sum();

            let background = Rect::new(
                (width / 2.0 - total / 2.0 - pad).round(),
                (center_y - font / 2.0 - pad / 2.0).round(),
                (total + pad * 2.0).round(),
                (font + pad).round(),
            );

            let text_y = center_y + TEXT_NUDGE_RATIO * height;
            let underline_y = (center_y + font * UNDERLINE_RATIO).round();
            let stroke = (font * UNDERLINE_WIDTH_RATIO).round().max(1.0);

            let mut x = width / 2.0 - total / 2.0;
            let placed = group
                .iter()
                .zip(measured)
                .map(|(segment, (face, seg_width))| {
                    let left = x.round();
                    let underline = segment.style.underlined.then(|| {
                        (
                            Vec2::new(left, underline_y),
                            Vec2::new((x + seg_width).round(), underline_y),
                            stroke,
                        )
                    });
                    x += seg_width;
                    PlacedSegment {
                        text: segment.text.clone(),
                        origin: Vec2::new(left, text_y),
                        width: seg_width,
                        font: face,
                        underline,
                    }
                })
                .collect();

            PlacedLine {
                center_y,
                background,
                segments: placed,
            }
        })
        .collect();

    SubtitleLayout { metrics, lines }
}

/// Paint a layout. Does not clear first.
pub fn paint<P: SubtitlePainter + ?Sized>(layout: &SubtitleLayout, painter: &mut P) {
    for line in &layout.lines {
        painter.fill_rect(line.background, BACKGROUND);
        for segment in &line.segments {
            painter.fill_text(&segment.text, segment.origin, &segment.font, TEXT_COLOR);
            if let Some((from, to, width)) = segment.underline {
                painter.stroke_line(from, to, width, TEXT_COLOR);
            }
        }
    }
}
