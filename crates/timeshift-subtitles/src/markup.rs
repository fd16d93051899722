//! Inline-markup caption text.
//!
//! Cue text lives in `<div style="...white-space: pre-wrap; ... plaintext;">`
//! containers. Inside, `<b>`, `<i>` and `<u>` toggle styling until the
//! matching close tag, and a literal newline starts a new display line.

use crate::line::{StyleFlags, SubtitleLine};

/// Marker that opens a cue text container.
pub const TEXT_OPEN: &str = "plaintext;\">";
/// End of a cue text container.
pub const TEXT_CLOSE: &str = "</div>";

/// Each cue text run in `html`, in document order, with `&amp;` decoded.
pub fn text_runs(html: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut rest = html;
    while let Some(open) = rest.find(TEXT_OPEN) {
        let body = &rest[open + TEXT_OPEN.len()..];
        let Some(close) = body.find(TEXT_CLOSE) else {
            break;
        };
        runs.push(body[..close].replace("&amp;", "&"));
        rest = &body[close..];
    }
    runs
}

/// Segments for one text run.
///
/// `run_index` counts runs across every caption element of the frame; runs
/// after the first start a new line.
pub fn parse_run(text: &str, run_index: usize) -> Vec<SubtitleLine> {
    if has_style_tags(text) {
        parse_styled(text, run_index > 0)
    } else {
        text.split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| SubtitleLine::plain(line, true))
            .collect()
    }
}

fn has_style_tags(text: &str) -> bool {
    ["<b>", "<i>", "<u>"].iter().any(|tag| text.contains(tag))
}

#[derive(Clone, Copy)]
enum Tag {
    Bold,
    Italic,
    Underline,
}

impl Tag {
    fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'b' => Some(Self::Bold),
            b'i' => Some(Self::Italic),
            b'u' => Some(Self::Underline),
            _ => None,
        }
    }

    fn apply(self, style: &mut StyleFlags, on: bool) {
        match self {
            Self::Bold => style.bold = on,
            Self::Italic => style.italic = on,
            Self::Underline => style.underlined = on,
        }
    }
}

/// Recognise `<x>` or `</x>` at the start of `rest`. Returns the tag, whether
/// it opens, and its byte length.
fn style_tag(rest: &str) -> Option<(Tag, bool, usize)> {
    let bytes = rest.as_bytes();
    match bytes {
        [b'<', b'/', letter, b'>', ..] => Tag::from_letter(*letter).map(|tag| (tag, false, 4)),
        [b'<', letter, b'>', ..] => Tag::from_letter(*letter).map(|tag| (tag, true, 3)),
        _ => None,
    }
}

struct SegmentBuilder {
    segments: Vec<SubtitleLine>,
    text: String,
    needs_newline: bool,
    style: StyleFlags,
}

impl SegmentBuilder {
    fn push_pending(&mut self) {
        let text = std::mem::take(&mut self.text);
        let text = if self.needs_newline {
            text.trim_start_matches(' ').to_string()
        } else {
            text
        };
        self.segments
            .push(SubtitleLine::new(text, self.needs_newline, self.style));
    }
}

/// Parse text containing style tags.
pub fn parse_styled(text: &str, starts_line: bool) -> Vec<SubtitleLine> {
    let mut builder = SegmentBuilder {
        segments: Vec::new(),
        text: String::new(),
        needs_newline: starts_line,
        style: StyleFlags::default(),
    };

    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some((tag, opens, len)) = style_tag(rest) {
                if !builder.text.is_empty() {
                    builder.push_pending();
                    builder.needs_newline = false;
                }
                tag.apply(&mut builder.style, opens);
                rest = &rest[len..];
                continue;
            }
            builder.text.push(c);
        } else if c == '\n' {
            if !builder.text.is_empty() {
                let trimmed = builder.text.trim_end_matches(' ').len();
                builder.text.truncate(trimmed);
                builder.push_pending();
            }
            builder.needs_newline = true;
        } else {
            builder.text.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    if !builder.text.is_empty() {
        builder.push_pending();
    }

    builder
        .segments
        .into_iter()
        .filter(|segment| !segment.text.trim().is_empty())
        .collect()
}
