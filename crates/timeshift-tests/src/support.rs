//! Recording host used by the integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use timeshift_core::{
    DecodedImage, Delay, ElementId, Frame, ProgramHandle, Rect, Result, SharedImage, TextureHandle,
    TimeshiftError, Timestamp, Vec2,
};
use timeshift_engine::{
    DelayMode, ElementLayout, EngineConfig, MediaElement, MediaKind, Monitor, OverlayPlan,
    Platform, Scheduler, Settings, SettingsMessage,
};
use timeshift_gpu::{FrameSource, GpuBackend, ReadyState};
use timeshift_subtitles::{
    CaptionDocument, CaptionElement, CaptionNodeId, FontSpec, InlineStyle, Rgba, SubtitlePainter,
    TextMeasure,
};

pub const VIDEO: ElementId = ElementId(1);
pub const CAPTIONS: CaptionNodeId = CaptionNodeId(1);

/// Backend that records every call it receives.
#[derive(Debug, Default)]
pub struct RecordingGpu {
    next: u64,
    pub live: HashSet<TextureHandle>,
    pub deleted: Vec<TextureHandle>,
    pub draws: Vec<TextureHandle>,
    pub clears: u64,
    pub programs_deleted: u64,
    pub size: (u32, u32),
    pub lost: bool,
}

impl GpuBackend for RecordingGpu {
    fn create_texture(&mut self) -> Result<TextureHandle> {
        if self.lost {
            return Err(TimeshiftError::ContextLost);
        }
        self.next += 1;
        let texture = TextureHandle(self.next);
        self.live.insert(texture);
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.live.remove(&texture);
        self.deleted.push(texture);
    }

    fn is_texture(&self, texture: TextureHandle) -> bool {
        self.live.contains(&texture)
    }

    fn upload_image(&mut self, texture: TextureHandle, _image: &DecodedImage) -> Result<()> {
        if self.live.contains(&texture) {
            Ok(())
        } else {
            Err(TimeshiftError::UnknownTexture(texture))
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        Ok(ProgramHandle(1))
    }

    fn delete_program(&mut self, _program: ProgramHandle) {
        self.programs_deleted += 1;
    }

    fn draw_quad(&mut self, _program: ProgramHandle, texture: TextureHandle) -> Result<()> {
        self.draws.push(texture);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.clears += 1;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn lose_context(&mut self) {
        self.live.clear();
        self.lost = true;
    }
}

/// Painter that keeps the text painted since the last clear.
#[derive(Debug, Default)]
pub struct RecordingPainter {
    pub shown: Vec<String>,
    pub clears: u64,
}

impl TextMeasure for RecordingPainter {
    fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        text.chars().count() as f32 * font.size_px as f32 * 0.5
    }
}

impl SubtitlePainter for RecordingPainter {
    fn clear(&mut self) {
        self.shown.clear();
        self.clears += 1;
    }

    fn fill_rect(&mut self, _rect: Rect, _color: Rgba) {}

    fn fill_text(&mut self, text: &str, _origin: Vec2, _font: &FontSpec, _color: Rgba) {
        self.shown.push(text.to_string());
    }

    fn stroke_line(&mut self, _from: Vec2, _to: Vec2, _width: f32, _color: Rgba) {}
}

pub struct Video {
    pub id: ElementId,
    pub ready: ReadyState,
    pub paused: bool,
    pub ended: bool,
    pub concealed: bool,
    pub layout: ElementLayout,
    image: SharedImage,
    decoded: u32,
}

impl Video {
    pub fn playing(id: ElementId) -> Self {
        Self {
            id,
            ready: ReadyState::HaveEnoughData,
            paused: false,
            ended: false,
            concealed: false,
            layout: ElementLayout {
                rect: Rect::new(0.0, 0.0, 320.0, 180.0),
                video_size: (32, 18),
                ..ElementLayout::default()
            },
            image: Arc::new(DecodedImage::test_pattern(32, 18, 0)),
            decoded: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        !self.paused && !self.ended
    }

    pub fn advance(&mut self) {
        self.decoded += 1;
        self.image = Arc::new(DecodedImage::test_pattern(32, 18, self.decoded));
    }
}

impl FrameSource for Video {
    fn ready_state(&self) -> ReadyState {
        self.ready
    }

    fn current_image(&self) -> Option<SharedImage> {
        Some(self.image.clone())
    }
}

impl MediaElement for Video {
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
        self.layout
    }

    fn set_concealed(&mut self, concealed: bool) {
        self.concealed = concealed;
    }
}

/// A page with at most one caption container, either inline markup or a
/// roll-up window.
#[derive(Debug, Default)]
pub struct CaptionPage {
    class_name: String,
    html: Option<String>,
    pub styles: HashMap<CaptionNodeId, InlineStyle>,
}

impl CaptionPage {
    pub fn styled(text: &str) -> Self {
        let mut page = Self::default();
        page.set_styled(text);
        page
    }

    pub fn rollup(lines: &[&[&str]]) -> Self {
        let mut page = Self::default();
        page.set_rollup(lines);
        page
    }

    pub fn set_styled(&mut self, text: &str) {
        self.class_name = "jw-captions jw-reset".to_string();
        self.html = Some(format!(
            r#"<div class="jw-reset"><div style="unicode-bidi: plaintext;">{text}</div></div>"#
        ));
    }

    pub fn set_rollup(&mut self, lines: &[&[&str]]) {
        let mut html = String::from(r#"<div class="caption-window ytp-caption-window-rollup">"#);
        for line in lines {
            html.push_str(r#"<span class="caption-visual-line">"#);
            for segment in *line {
                html.push_str(&format!(r#"<span class="ytp-caption-segment">{segment}</span>"#));
            }
            html.push_str("</span>");
        }
        html.push_str("</div>");
        self.class_name = "caption-window ytp-caption-window-rollup".to_string();
        self.html = Some(html);
    }

    pub fn opacity(&self) -> Option<&str> {
        self.styles
            .get(&CAPTIONS)
            .and_then(|style| style.opacity.as_deref())
    }
}

impl CaptionDocument for CaptionPage {
    fn caption_elements(&self) -> Vec<CaptionElement> {
        self.html
            .iter()
            .map(|_| CaptionElement {
                id: CAPTIONS,
                class_name: self.class_name.clone(),
                visible: true,
            })
            .collect()
    }

    fn inner_html(&self, node: CaptionNodeId) -> Option<String> {
        (node == CAPTIONS).then(|| self.html.clone()).flatten()
    }

    fn inline_style(&self, node: CaptionNodeId) -> InlineStyle {
        self.styles.get(&node).cloned().unwrap_or_default()
    }

    fn set_inline_style(&mut self, node: CaptionNodeId, style: &InlineStyle) {
        self.styles.insert(node, style.clone());
    }
}

#[derive(Default)]
pub struct Host {
    pub page: CaptionPage,
    pub overlays: HashMap<ElementId, OverlayPlan>,
    pub removed: Vec<ElementId>,
    pub surfaces_created: u32,
    pub refuse_surfaces: bool,
}

impl Platform for Host {
    type Element = Video;
    type Gpu = RecordingGpu;
    type Painter = RecordingPainter;
    type Document = CaptionPage;

    fn create_surfaces(
        &mut self,
        _element: &Video,
        _plan: &OverlayPlan,
    ) -> Result<(RecordingGpu, RecordingPainter)> {
        if self.refuse_surfaces {
            return Err(TimeshiftError::Gpu("no context available".into()));
        }
        self.surfaces_created += 1;
        Ok((RecordingGpu::default(), RecordingPainter::default()))
    }

    fn place_overlays(&mut self, id: ElementId, plan: &OverlayPlan) {
        self.overlays.insert(id, *plan);
    }

    fn remove_overlays(&mut self, id: ElementId) {
        self.overlays.remove(&id);
        self.removed.push(id);
    }

    fn captions(&mut self) -> &mut CaptionPage {
        &mut self.page
    }
}

/// Frame on screen: capture sequence and capture time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shown {
    pub sequence: u64,
    pub captured_at: Timestamp,
}

impl From<&Frame> for Shown {
    fn from(frame: &Frame) -> Self {
        Self {
            sequence: frame.sequence,
            captured_at: frame.captured_at,
        }
    }
}

/// Drives a monitor with one video element on a simulated display.
pub struct Harness {
    pub monitor: Monitor<Host>,
    interval_ms: f64,
    decode_every: u64,
    tick: u64,
}

impl Harness {
    /// 60 Hz display, 30 fps video, delay in video mode.
    pub fn video(delay_ms: u64) -> Self {
        Self::with(
            Host::default(),
            EngineConfig::default(),
            Settings::new(DelayMode::Video, Delay::from_millis(delay_ms), true),
        )
    }

    pub fn with(host: Host, config: EngineConfig, settings: Settings) -> Self {
        let mut monitor = Monitor::new(host, config);
        monitor.load_settings(settings, Timestamp::ZERO);
        monitor.discover(Video::playing(VIDEO));
        Self {
            monitor,
            interval_ms: 1000.0 / 60.0,
            decode_every: 2,
            tick: 0,
        }
    }

    pub fn update_delay(&mut self, delay_ms: u64) {
        let now = self.now();
        self.monitor.handle_message(
            &SettingsMessage::UpdateDelay {
                delay: Delay::from_millis(delay_ms),
            },
            now,
        );
    }

    /// Change the display rate; the video decodes on every `decode_every`th refresh.
    pub fn at_rate(mut self, hz: f64, decode_every: u64) -> Self {
        self.interval_ms = 1000.0 / hz;
        self.decode_every = decode_every.max(1);
        self
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::from_millis_f64(self.tick as f64 * self.interval_ms)
    }

    pub fn now_ms(&self) -> f64 {
        self.tick as f64 * self.interval_ms
    }

    /// Clock of the most recent refresh.
    pub fn last_refresh_ms(&self) -> f64 {
        self.tick.saturating_sub(1) as f64 * self.interval_ms
    }

    /// One display refresh, followed by a decoded frame when one is due.
    pub fn step(&mut self) {
        let now = self.now();
        self.monitor.on_refresh(now);
        if self.tick % self.decode_every == 0 {
            let decoded = self.monitor.element_mut(VIDEO).is_some_and(|video| {
                if video.is_playing() {
                    video.advance();
                    true
                } else {
                    false
                }
            });
            if decoded {
                self.monitor.on_decoded_frame(VIDEO, now);
            }
        }
        self.tick += 1;
    }

    /// Step until the clock reaches `ms`.
    pub fn run_until(&mut self, ms: f64) {
        self.run_until_with(ms, |_| {});
    }

    /// Step until the clock reaches `ms`, calling `check` after every refresh.
    /// A refresh landing exactly on `ms` is not run.
    pub fn run_until_with(&mut self, ms: f64, mut check: impl FnMut(&Self)) {
        while self.now_ms() < ms - 1e-3 {
            self.step();
            check(self);
        }
    }

    pub fn scheduler(&self) -> &Scheduler<Host> {
        self.monitor
            .scheduler(VIDEO)
            .expect("video scheduler attached")
    }

    pub fn element(&self) -> &Video {
        self.monitor.element(VIDEO).expect("video tracked")
    }

    pub fn element_mut(&mut self) -> &mut Video {
        self.monitor.element_mut(VIDEO).expect("video tracked")
    }

    /// The frame whose texture was drawn last, if it is still held.
    pub fn shown(&self) -> Option<Shown> {
        let scheduler = self.monitor.scheduler(VIDEO)?;
        let drawn = *scheduler.gpu().draws.last()?;
        scheduler
            .delayed_frame()
            .into_iter()
            .chain(scheduler.initial_frame())
            .find(|frame| frame.texture == drawn)
            .map(Shown::from)
    }

    /// Text on the subtitle overlay.
    pub fn caption_text(&self) -> String {
        self.monitor
            .scheduler(VIDEO)
            .map(|scheduler| scheduler.painter().shown.join(" "))
            .unwrap_or_default()
    }
}
