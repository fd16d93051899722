//! Synthetic media: a moving colour-bar video and a caption track that
//! changes every two seconds.

use std::collections::HashMap;
use std::sync::Arc;
use timeshift_core::{DecodedImage, ElementId, Rect, SharedImage, Timestamp, Transform2D};
use timeshift_engine::{ElementLayout, MediaElement, MediaKind};
use timeshift_gpu::{FrameSource, ReadyState};
use timeshift_subtitles::{CaptionDocument, CaptionElement, CaptionNodeId, InlineStyle};

pub const CAPTION_NODE: CaptionNodeId = CaptionNodeId(1);
const CUE_PERIOD_MS: u64 = 2000;

pub struct SyntheticVideo {
    id: ElementId,
    width: u32,
    height: u32,
    image: SharedImage,
    decoded: u32,
    paused: bool,
    ended: bool,
    concealed: bool,
}

impl SyntheticVideo {
    pub fn new(id: ElementId, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            image: Arc::new(DecodedImage::test_pattern(width, height, 0)),
            decoded: 0,
            paused: false,
            ended: false,
            concealed: false,
        }
    }

    /// Decode the next picture. Returns `false` while paused or ended.
    pub fn decode(&mut self) -> bool {
        if self.paused || self.ended {
            return false;
        }
        self.decoded += 1;
        self.image = Arc::new(DecodedImage::test_pattern(self.width, self.height, self.decoded * 4));
        true
    }

    pub fn set_ended(&mut self, ended: bool) {
        self.ended = ended;
        self.paused = ended;
    }

    pub fn decoded(&self) -> u32 {
        self.decoded
    }

    pub fn is_concealed(&self) -> bool {
        self.concealed
    }
}

impl FrameSource for SyntheticVideo {
    fn ready_state(&self) -> ReadyState {
        if self.decoded == 0 {
            ReadyState::HaveMetadata
        } else {
            ReadyState::HaveEnoughData
        }
    }

    fn current_image(&self) -> Option<SharedImage> {
        Some(self.image.clone())
    }
}

impl MediaElement for SyntheticVideo {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn is_ended(&self) -> bool {
        self.ended
    }

    fn layout(&self) -> ElementLayout {
        ElementLayout {
            rect: Rect::new(0.0, 0.0, self.width as f32, self.height as f32),
            transform: Transform2D::IDENTITY,
            device_pixel_ratio: 1.0,
            video_size: (self.width, self.height),
        }
    }

    fn set_concealed(&mut self, concealed: bool) {
        self.concealed = concealed;
    }
}

/// One inline-markup caption container whose cue follows the clock.
#[derive(Debug, Default)]
pub struct SyntheticCaptions {
    cue: u64,
    styles: HashMap<CaptionNodeId, InlineStyle>,
}

impl SyntheticCaptions {
    pub fn update(&mut self, now: Timestamp) {
        self.cue = now.as_duration().as_millis() as u64 / CUE_PERIOD_MS;
    }

    pub fn cue_text(&self) -> String {
        if self.cue % 2 == 0 {
            format!("Caption {}", self.cue)
        } else {
            format!("<i>Caption</i> <b>{}</b>", self.cue)
        }
    }
}

impl CaptionDocument for SyntheticCaptions {
    fn caption_elements(&self) -> Vec<CaptionElement> {
        vec![CaptionElement {
            id: CAPTION_NODE,
            class_name: "jw-captions jw-reset".to_string(),
            visible: true,
        }]
    }

    fn inner_html(&self, node: CaptionNodeId) -> Option<String> {
        (node == CAPTION_NODE).then(|| {
            format!(
                r#"<div class="jw-reset"><div style="white-space: pre-wrap; unicode-bidi: plaintext;">{}</div></div>"#,
                self.cue_text()
            )
        })
    }

    fn inline_style(&self, node: CaptionNodeId) -> InlineStyle {
        self.styles.get(&node).cloned().unwrap_or_default()
    }

    fn set_inline_style(&mut self, node: CaptionNodeId, style: &InlineStyle) {
        self.styles.insert(node, style.clone());
    }
}

/// Sine test tone, interleaved.
#[derive(Debug)]
pub struct Tone {
    frequency: f32,
    phase: f32,
}

impl Tone {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            phase: 0.0,
        }
    }

    pub fn fill(&mut self, block: &mut [f32], sample_rate: u32, channels: u16) {
        let step = self.frequency / sample_rate.max(1) as f32;
        for frame in block.chunks_mut(channels.max(1) as usize) {
            let sample = (self.phase * std::f32::consts::TAU).sin() * 0.2;
            frame.fill(sample);
            self.phase = (self.phase + step).fract();
        }
    }
}
