//! Lifecycle monitor: discovers media elements, attaches schedulers and
//! audio routes per the current settings, and forwards host callbacks.

use crate::media::{MediaElement, MediaKind};
use crate::overlay::OverlayPlan;
use crate::scheduler::DelayScheduler;
use crate::settings::{DelayMode, EngineConfig, Settings, SettingsMessage};
use std::collections::{BTreeMap, BTreeSet};
use timeshift_audio::AudioDelayGraph;
use timeshift_core::{ElementId, Result, Timestamp};
use timeshift_gpu::{FrameSource, GpuBackend, ReadyState};
use timeshift_subtitles::{CaptionDocument, SubtitlePainter};
use tracing::{debug, info, warn};

/// Host services the monitor needs.
pub trait Platform {
    type Element: MediaElement;
    type Gpu: GpuBackend;
    type Painter: SubtitlePainter;
    type Document: CaptionDocument;

    /// Create the video and subtitle surfaces for `element`.
    fn create_surfaces(
        &mut self,
        element: &Self::Element,
        plan: &OverlayPlan,
    ) -> Result<(Self::Gpu, Self::Painter)>;

    /// Show or move an element's overlays.
    fn place_overlays(&mut self, id: ElementId, plan: &OverlayPlan);

    fn remove_overlays(&mut self, id: ElementId);

    fn captions(&mut self) -> &mut Self::Document;
}

/// Scheduler type for a platform's surfaces.
pub type Scheduler<P> = DelayScheduler<<P as Platform>::Gpu, <P as Platform>::Painter>;

struct Tracked<P: Platform> {
    element: P::Element,
    scheduler: Option<Scheduler<P>>,
}

pub struct Monitor<P: Platform> {
    platform: P,
    config: EngineConfig,
    settings: Settings,
    elements: BTreeMap<ElementId, Tracked<P>>,
    /// Detached schedulers waiting out the drain bound.
    draining: Vec<Scheduler<P>>,
    audio: Option<AudioDelayGraph>,
    /// Elements waiting for metadata before their audio route is built.
    pending_audio: BTreeSet<ElementId>,
    visible: bool,
    watching: bool,
}

impl<P: Platform> Monitor<P> {
    pub fn new(platform: P, config: EngineConfig) -> Self {
        Self {
            platform,
            config,
            settings: Settings::default(),
            elements: BTreeMap::new(),
            draining: Vec::new(),
            audio: None,
            pending_audio: BTreeSet::new(),
            visible: true,
            watching: false,
        }
    }

    /// Apply stored settings at startup.
    pub fn load_settings(&mut self, settings: Settings, now: Timestamp) {
        info!(mode = ?settings.mode, delay = %settings.delay, enabled = settings.enabled, "settings loaded");
        self.settings = settings;
        self.stop_video(now);
        self.configure();
    }

    /// React to a settings message.
    pub fn handle_message(&mut self, message: &SettingsMessage, now: Timestamp) {
        self.settings = self.settings.apply(message);
        let Settings {
            mode,
            delay,
            enabled,
        } = self.settings;
        debug!(?message, "settings message");

        match message {
            SettingsMessage::SetDelay { .. } => {
                self.stop_video(now);
                self.stop_audio();
                self.configure();
            }
            SettingsMessage::UpdateDelay { .. } if !enabled => {
                self.stop_video(now);
                self.stop_audio();
            }
            SettingsMessage::UpdateDelay { .. } => match mode {
                DelayMode::Video => {
                    for tracked in self.elements.values_mut() {
                        if let Some(scheduler) = tracked.scheduler.as_mut() {
                            scheduler.update_delay(delay);
                        }
                    }
                }
                DelayMode::Audio => {
                    if let Some(graph) = self.audio.as_mut() {
                        graph.set_delay(delay);
                    }
                }
            },
        }
    }

    fn configure(&mut self) {
        let Settings {
            mode,
            delay,
            enabled,
        } = self.settings;
        if !enabled {
            self.stop_audio();
            return;
        }
        match mode {
            DelayMode::Video => {
                self.watching = true;
                info!(%delay, "watching for video elements");
            }
            DelayMode::Audio => {
                let (sample_rate, channels) =
                    (self.config.audio_sample_rate, self.config.audio_channels);
                let graph = self
                    .audio
                    .get_or_insert_with(|| AudioDelayGraph::new(sample_rate, channels));
                graph.set_delay(delay);
                graph.enable();
                for &id in self.elements.keys() {
                    if !graph.contains(id) {
                        self.pending_audio.insert(id);
                    }
                }
                self.attach_ready_audio();
                info!(%delay, routes = self.audio_route_count(), "audio delay active");
            }
        }
    }

    /// Detach every scheduler and stop watching for new video frames.
    fn stop_video(&mut self, now: Timestamp) {
        self.watching = false;
        let ids: Vec<ElementId> = self.elements.keys().copied().collect();
        for id in ids {
            self.detach_scheduler(id, now);
        }
    }

    /// Route all audio dry. Routes stay attached.
    fn stop_audio(&mut self) {
        if let Some(graph) = self.audio.as_mut() {
            graph.stop();
        }
        self.pending_audio.clear();
    }

    fn detach_scheduler(&mut self, id: ElementId, now: Timestamp) {
        let Some(tracked) = self.elements.get_mut(&id) else {
            return;
        };
        let Some(mut scheduler) = tracked.scheduler.take() else {
            return;
        };
        scheduler.detach(self.platform.captions(), now);
        tracked.element.set_concealed(false);
        self.platform.remove_overlays(id);
        self.draining.push(scheduler);
    }

    /// Start tracking an element. Elements inside overlays and elements
    /// already tracked are ignored. Returns whether it was added.
    pub fn discover(&mut self, element: P::Element) -> bool {
        let id = element.id();
        if element.is_overlay() || self.elements.contains_key(&id) {
            return false;
        }
        debug!(element = %id, kind = ?element.kind(), "element discovered");
        self.elements.insert(
            id,
            Tracked {
                element,
                scheduler: None,
            },
        );
        if self.audio_active() {
            self.pending_audio.insert(id);
            self.attach_ready_audio();
        }
        true
    }

    /// Forget an element entirely.
    pub fn remove_element(&mut self, id: ElementId, now: Timestamp) -> Option<P::Element> {
        self.detach_scheduler(id, now);
        self.pending_audio.remove(&id);
        if let Some(graph) = self.audio.as_mut() {
            graph.detach(id);
        }
        self.elements.remove(&id).map(|tracked| tracked.element)
    }

    /// The element's source was replaced: detach and wait for its next frame.
    pub fn on_emptied(&mut self, id: ElementId, now: Timestamp) {
        if self.elements.contains_key(&id) {
            debug!(element = %id, "source emptied, re-watching");
            self.detach_scheduler(id, now);
        }
    }

    /// Decoded-frame hook for one element.
    pub fn on_decoded_frame(&mut self, id: ElementId, now: Timestamp) -> bool {
        if !self.visible {
            return false;
        }
        let video_mode = self.watching
            && self.settings.enabled
            && self.settings.mode == DelayMode::Video;
        let Some(tracked) = self.elements.get_mut(&id) else {
            return false;
        };

        if tracked.scheduler.is_none() {
            if !video_mode || tracked.element.kind() != MediaKind::Video {
                return false;
            }
            let plan = OverlayPlan::for_layout(&tracked.element.layout());
            let (gpu, painter) = match self.platform.create_surfaces(&tracked.element, &plan) {
                Ok(surfaces) => surfaces,
                Err(err) => {
                    warn!(element = %id, %err, "overlay surfaces unavailable, leaving element untouched");
                    return false;
                }
            };
            let scheduler = DelayScheduler::attach(
                id,
                gpu,
                painter,
                self.platform.captions(),
                &plan,
                &self.config,
                self.settings.delay,
            );
            self.platform.place_overlays(id, &plan);
            tracked.element.set_concealed(true);
            tracked.scheduler = Some(scheduler);
        }

        match tracked.scheduler.as_mut() {
            Some(scheduler) => {
                scheduler.on_decoded_frame(&tracked.element, &*self.platform.captions(), now)
            }
            None => false,
        }
    }

    /// Display refresh hook.
    pub fn on_refresh(&mut self, now: Timestamp) {
        self.draining.retain_mut(|scheduler| !scheduler.poll_teardown(now));

        if !self.pending_audio.is_empty() {
            self.attach_ready_audio();
        }
        if !self.visible {
            return;
        }
        for tracked in self.elements.values_mut() {
            if let Some(scheduler) = tracked.scheduler.as_mut() {
                scheduler.on_refresh(&tracked.element, now);
            }
        }
    }

    /// The element's box, transform or intrinsic size changed.
    pub fn on_resize(&mut self, id: ElementId) {
        let Some(tracked) = self.elements.get_mut(&id) else {
            return;
        };
        let Some(scheduler) = tracked.scheduler.as_mut() else {
            return;
        };
        let plan = OverlayPlan::for_layout(&tracked.element.layout());
        scheduler.resize(&plan);
        self.platform.place_overlays(id, &plan);
    }

    /// Metadata arrived; build a deferred audio route.
    pub fn on_loaded_metadata(&mut self, id: ElementId) {
        if self.pending_audio.contains(&id) {
            self.attach_ready_audio();
        }
    }

    /// Page visibility change.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        debug!(visible, "page visibility changed");
        for tracked in self.elements.values_mut() {
            if let Some(scheduler) = tracked.scheduler.as_mut() {
                scheduler.set_visible(visible);
            }
        }
    }

    fn attach_ready_audio(&mut self) {
        let Some(graph) = self.audio.as_mut() else {
            return;
        };
        let elements = &self.elements;
        self.pending_audio.retain(|id| {
            let Some(tracked) = elements.get(id) else {
                return false;
            };
            if tracked.element.ready_state() < ReadyState::HaveMetadata {
                return true;
            }
            graph.attach(*id);
            debug!(element = %id, "audio route attached");
            false
        });
    }

    /// Run one block of an element's audio through its route. Elements
    /// without a route pass through unchanged.
    pub fn process_audio(&mut self, id: ElementId, input: &[f32], output: &mut [f32]) -> Result<()> {
        match self.audio.as_mut() {
            Some(graph) if graph.contains(id) => graph.process(id, input, output),
            _ => {
                let n = input.len().min(output.len());
                output[..n].copy_from_slice(&input[..n]);
                output[n..].fill(0.0);
                Ok(())
            }
        }
    }

    /// Detach everything and delete GPU resources without waiting.
    pub fn shutdown(&mut self, now: Timestamp) {
        self.stop_video(now);
        self.stop_audio();
        for mut scheduler in self.draining.drain(..) {
            scheduler.force_teardown();
        }
        info!(elements = self.elements.len(), "monitor shut down");
    }

    fn audio_active(&self) -> bool {
        self.settings.enabled && self.settings.mode == DelayMode::Audio && self.audio.is_some()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn element(&self, id: ElementId) -> Option<&P::Element> {
        self.elements.get(&id).map(|tracked| &tracked.element)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut P::Element> {
        self.elements.get_mut(&id).map(|tracked| &mut tracked.element)
    }

    pub fn scheduler(&self, id: ElementId) -> Option<&Scheduler<P>> {
        self.elements.get(&id).and_then(|tracked| tracked.scheduler.as_ref())
    }

    pub fn scheduler_count(&self) -> usize {
        self.elements
            .values()
            .filter(|tracked| tracked.scheduler.is_some())
            .count()
    }

    /// Detached schedulers still waiting to release GPU resources.
    pub fn draining_count(&self) -> usize {
        self.draining.len()
    }

    pub fn audio(&self) -> Option<&AudioDelayGraph> {
        self.audio.as_ref()
    }

    pub fn audio_route_count(&self) -> usize {
        self.audio.as_ref().map_or(0, AudioDelayGraph::len)
    }

    pub fn is_audio_pending(&self, id: ElementId) -> bool {
        self.pending_audio.contains(&id)
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}
