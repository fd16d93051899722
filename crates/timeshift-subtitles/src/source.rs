//! Caption sources in the host document.
//!
//! Detection runs once per attach. The chosen format is never re-evaluated,
//! so a page that swaps caption systems mid-playback keeps the first one.

use crate::line::{retain_last_lines, SubtitleLine};
use crate::markup;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Marker present in inline-markup caption containers.
pub const STYLED_MARKER: &str = "jw-reset";
/// Class of a roll-up segmented caption window.
pub const ROLLUP_WINDOW: &str = "caption-window-rollup";
/// Class of a bottom-anchored segmented caption window.
pub const BOTTOM_WINDOW: &str = "caption-window-bottom";
/// Class of one visual line inside a segmented window.
pub const VISUAL_LINE: &str = "caption-visual-line";
/// Class of one text span inside a visual line.
pub const SEGMENT: &str = "caption-segment";

/// Logical lines a roll-up window keeps on screen.
pub const ROLLUP_LINES: usize = 2;

/// Identity of a caption node in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaptionNodeId(pub u64);

/// A node whose class mentions "caption".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionElement {
    pub id: CaptionNodeId,
    pub class_name: String,
    /// Rendered: not `display: none`, not `visibility: hidden`, opacity not 0.
    pub visible: bool,
}

/// Inline style properties touched when hiding native captions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub opacity: Option<String>,
    pub display: Option<String>,
}

/// Read/write access to the host's caption nodes.
pub trait CaptionDocument {
    /// Every node whose class mentions "caption", in document order.
    fn caption_elements(&self) -> Vec<CaptionElement>;

    /// Current inner markup of a node; `None` once it left the document.
    fn inner_html(&self, node: CaptionNodeId) -> Option<String>;

    fn inline_style(&self, node: CaptionNodeId) -> InlineStyle;

    fn set_inline_style(&mut self, node: CaptionNodeId, style: &InlineStyle);
}

/// Supported caption formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptionFormat {
    /// Inline-markup cues with bold/italic/underline tags.
    StyledMarkup,
    /// Segmented window that scrolls lines upward.
    Rollup,
    /// Segmented window anchored at the bottom.
    Bottom,
}

impl fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StyledMarkup => write!(f, "styled-markup"),
            Self::Rollup => write!(f, "rollup"),
            Self::Bottom => write!(f, "bottom"),
        }
    }
}

impl CaptionFormat {
    /// Pick a format among the visible caption nodes.
    ///
    /// Returns the format and the nodes to sample, or `None` when nothing
    /// supported is on the page.
    pub fn detect<D: CaptionDocument + ?Sized>(doc: &D) -> Option<(Self, Vec<CaptionNodeId>)> {
        let visible: Vec<CaptionElement> = doc
            .caption_elements()
            .into_iter()
            .filter(|el| el.visible)
            .collect();
        if visible.is_empty() {
            return None;
        }

        let styled = visible.iter().any(|el| {
            doc.inner_html(el.id)
                .is_some_and(|html| html.trim().contains(STYLED_MARKER))
        });
        if styled {
            return Some((Self::StyledMarkup, visible.iter().map(|el| el.id).collect()));
        }

        for (format, class) in [(Self::Rollup, ROLLUP_WINDOW), (Self::Bottom, BOTTOM_WINDOW)] {
            let nodes: Vec<CaptionNodeId> = visible
                .iter()
                .filter(|el| el.class_name.contains(class))
                .map(|el| el.id)
                .collect();
            if !nodes.is_empty() {
                return Some((format, nodes));
            }
        }
        None
    }

    /// Segments for one frame from the given nodes' markup.
    pub fn extract<'a, I>(self, htmls: I) -> Vec<SubtitleLine>
    where
        I: IntoIterator<Item = &'a str>,
    {
        match self {
            Self::StyledMarkup => {
                let mut lines = Vec::new();
                let mut run_index = 0;
                for html in htmls {
                    for run in markup::text_runs(html.trim()) {
                        lines.extend(markup::parse_run(&run, run_index));
                        run_index += 1;
                    }
                }
                lines
            }
            Self::Rollup => {
                let lines = htmls.into_iter().flat_map(segmented_lines).collect();
                retain_last_lines(lines, ROLLUP_LINES)
            }
            Self::Bottom => htmls.into_iter().flat_map(segmented_lines).collect(),
        }
    }
}

/// Visual lines and their segment spans, in order.
fn segmented_lines(html: &str) -> Vec<SubtitleLine> {
    let mut out = Vec::new();
    for line in html.split(VISUAL_LINE).skip(1) {
        let mut line_start = true;
        for span in line.split(SEGMENT).skip(1) {
            let Some(text) = span_text(span) else {
                continue;
            };
            let text = decode_entities(text.trim());
            if text.is_empty() {
                continue;
            }
            out.push(SubtitleLine::plain(text, line_start));
            line_start = false;
        }
    }
    out
}

/// Text between the end of the span's opening tag and `</span>`.
fn span_text(after_class: &str) -> Option<&str> {
    let open_end = after_class.find('>')?;
    let body = &after_class[open_end + 1..];
    let close = body.find("</span>")?;
    Some(&body[..close])
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// A detected source with its native captions hidden.
#[derive(Debug)]
pub struct CaptionSource {
    format: CaptionFormat,
    nodes: Vec<CaptionNodeId>,
    hidden: Vec<(CaptionNodeId, InlineStyle)>,
}

impl CaptionSource {
    /// Detect a format and hide the native caption nodes for it.
    pub fn attach<D: CaptionDocument + ?Sized>(doc: &mut D) -> Option<Self> {
        let Some((format, nodes)) = CaptionFormat::detect(doc) else {
            debug!("no supported caption source");
            return None;
        };

        let mut hidden = Vec::with_capacity(nodes.len());
        for &node in &nodes {
            let original = doc.inline_style(node);
            let concealed = InlineStyle {
                opacity: Some("0".to_string()),
                display: original.display.clone(),
            };
            doc.set_inline_style(node, &concealed);
            hidden.push((node, original));
        }

        info!(%format, nodes = nodes.len(), "caption source attached");
        Some(Self {
            format,
            nodes,
            hidden,
        })
    }

    pub fn format(&self) -> CaptionFormat {
        self.format
    }

    pub fn nodes(&self) -> &[CaptionNodeId] {
        &self.nodes
    }

    /// Segments currently shown by the native captions.
    pub fn sample<D: CaptionDocument + ?Sized>(&self, doc: &D) -> Vec<SubtitleLine> {
        let htmls: Vec<String> = self
            .nodes
            .iter()
            .filter_map(|&node| doc.inner_html(node))
            .collect();
        self.format.extract(htmls.iter().map(String::as_str))
    }

    /// Put the native captions back the way they were.
    pub fn restore<D: CaptionDocument + ?Sized>(&mut self, doc: &mut D) {
        for (node, original) in self.hidden.drain(..) {
            doc.set_inline_style(node, &original);
        }
    }
}
