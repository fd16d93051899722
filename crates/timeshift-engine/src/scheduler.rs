//! Per-element delay scheduler.
//!
//! Phases: `Priming -> Steady -> Draining -> Reset -> Steady ...`, and
//! `Detached` once the element is released.
//!
//! Frame slots: `initial` (first capture, shown until the delay has
//! elapsed from the baseline), the promotion queue (frames in flight, the
//! newest being the current frame) and `delayed` (the frame on screen).
//! A texture goes back to the pool only when it leaves its slot.

use crate::overlay::OverlayPlan;
use crate::promotion::PromotionQueue;
use crate::settings::EngineConfig;
use crate::teardown::Teardown;
use crate::media::MediaElement;
use crate::timing::{Mark, TimingStrategy};
use std::time::Duration;
use timeshift_core::{Delay, ElementId, Frame, Timestamp, TimingMode, Vec2};
use timeshift_gpu::{FrameCapture, GpuBackend, Renderer, TexturePool};
use timeshift_subtitles::{CaptionDocument, SubtitlePainter, SubtitlePipeline, SubtitleSnapshot};
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first capture.
    Priming,
    Steady,
    /// Playback stopped and the countdown expired. `cleared` when the
    /// source ended and both surfaces were wiped; otherwise frozen on the
    /// last shown frame.
    Draining { cleared: bool },
    /// Stale frames dropped; the next capture re-primes.
    Reset,
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownKind {
    Paused,
    Ended,
}

/// Pending stop: fires once the delay has elapsed from `started`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub kind: CountdownKind,
    pub started: Mark,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub captures: u64,
    pub promotions: u64,
    pub discards: u64,
    pub draws: u64,
}

fn release_frame<G: GpuBackend>(pool: &mut TexturePool, gpu: &mut G, frame: Frame) {
    if let Err(err) = pool.release(gpu, frame.texture) {
        trace!(%err, sequence = frame.sequence, "frame release failed");
    }
}

/// Delays one video element's picture and captions.
pub struct DelayScheduler<G: GpuBackend, P: SubtitlePainter> {
    id: ElementId,
    delay: Delay,
    phase: Phase,
    active: bool,
    visible: bool,

    gpu: G,
    painter: P,
    pool: TexturePool,
    capture: FrameCapture,
    renderer: Renderer,
    subtitles: SubtitlePipeline,
    timing: TimingStrategy,

    refresh: u64,
    baseline: Option<Mark>,
    initial: Option<Frame>,
    frames: PromotionQueue<Frame>,
    captions: PromotionQueue<SubtitleSnapshot>,
    delayed: Option<Frame>,
    /// Frames with a sequence at or below this are never promoted.
    watermark: u64,
    countdown: Option<Countdown>,

    teardown: Teardown,
    drain_bound: Duration,
    overlay_size: Vec2,
    needs_redraw: bool,
    stats: SchedulerStats,
}

impl<G: GpuBackend, P: SubtitlePainter> DelayScheduler<G, P> {
    /// Take over an element: size the video surface and hide native captions.
    pub fn attach<D: CaptionDocument + ?Sized>(
        id: ElementId,
        mut gpu: G,
        painter: P,
        doc: &mut D,
        plan: &OverlayPlan,
        config: &EngineConfig,
        delay: Delay,
    ) -> Self {
        let (width, height) = plan.video.backing;
        gpu.resize(width, height);
        let subtitles = SubtitlePipeline::attach(doc);
        info!(element = %id, %delay, captions = ?subtitles.format(), "delay scheduler attached");

        Self {
            id,
            delay,
            phase: Phase::Priming,
            active: true,
            visible: true,
            gpu,
            painter,
            pool: TexturePool::new(config.pool_capacity),
            capture: FrameCapture::new(),
            renderer: Renderer::new(),
            subtitles,
            timing: TimingStrategy::from_config(config),
            refresh: 0,
            baseline: None,
            initial: None,
            frames: PromotionQueue::new(),
            captions: PromotionQueue::new(),
            delayed: None,
            watermark: 0,
            countdown: None,
            teardown: Teardown::Live,
            drain_bound: config.drain_bound(),
            overlay_size: plan.subtitle_css_size(),
            needs_redraw: false,
            stats: SchedulerStats::default(),
        }
    }

    /// Display refresh hook.
    pub fn on_refresh<E: MediaElement + ?Sized>(&mut self, element: &E, now: Timestamp) {
        if !self.active || !self.visible {
            return;
        }
        self.refresh += 1;
        let mark = Mark::new(now, self.refresh);

        if self.timing.observe_refresh(now) {
            if let Some(baseline) = self.baseline.as_mut() {
                baseline.at = now;
            }
        }

        self.update_countdown(element, mark);

        match self.phase {
            Phase::Steady => self.render_steady(mark),
            Phase::Draining { cleared } if self.needs_redraw => {
                self.needs_redraw = false;
                if !cleared {
                    self.redraw_shown();
                }
            }
            _ => {}
        }
    }

    fn update_countdown<E: MediaElement + ?Sized>(&mut self, element: &E, mark: Mark) {
        if self.phase != Phase::Steady {
            return;
        }
        let ended = element.is_ended();
        let paused = element.is_paused();

        if ended {
            match self.countdown.as_mut() {
                Some(countdown) => countdown.kind = CountdownKind::Ended,
                None => {
                    debug!(element = %self.id, "source ended, countdown armed");
                    self.countdown = Some(Countdown {
                        kind: CountdownKind::Ended,
                        started: mark,
                    });
                }
            }
        } else if paused && self.countdown.is_none() {
            debug!(element = %self.id, "source paused, countdown armed");
            self.countdown = Some(Countdown {
                kind: CountdownKind::Paused,
                started: mark,
            });
        }

        let Some(countdown) = self.countdown else {
            return;
        };
        if !self.timing.elapsed_reached(countdown.started, self.delay, mark) {
            return;
        }
        self.countdown = None;

        match countdown.kind {
            CountdownKind::Ended if ended => {
                self.renderer.clear(&mut self.gpu);
                self.subtitles.clear(&mut self.painter);
                self.release_all();
                self.phase = Phase::Draining { cleared: true };
                info!(element = %self.id, "delayed playback finished, surfaces cleared");
            }
            CountdownKind::Paused if paused => {
                self.phase = Phase::Draining { cleared: false };
                debug!(element = %self.id, "delayed playback caught up with pause");
            }
            _ => debug!(element = %self.id, "countdown disarmed"),
        }
    }

    fn promote(&mut self, mark: Mark) {
        let due = self.frames.take_due(mark, &self.timing, self.watermark);
        self.stats.discards += due.discarded.len() as u64;
        for frame in due.discarded {
            trace!(sequence = frame.sequence, "discarding stale frame");
            release_frame(&mut self.pool, &mut self.gpu, frame);
        }
        if let Some(frame) = due.promoted {
            self.stats.promotions += 1;
            if let Some(previous) = self.delayed.replace(frame) {
                release_frame(&mut self.pool, &mut self.gpu, previous);
            }
        }

        if let Some(snapshot) = self
            .captions
            .take_due(mark, &self.timing, self.watermark)
            .promoted
        {
            self.subtitles.set_delayed(snapshot);
        }
    }

    fn render_steady(&mut self, mark: Mark) {
        self.promote(mark);
        self.needs_redraw = false;

        let pre_roll = self
            .baseline
            .map_or(true, |baseline| !self.timing.elapsed_reached(baseline, self.delay, mark));

        let (frame, is_delayed) = match (&self.initial, &self.delayed) {
            (Some(initial), Some(_)) if pre_roll => (Some(initial), false),
            (_, Some(delayed)) => (Some(delayed), true),
            (Some(initial), None) => (Some(initial), false),
            (None, None) => (None, false),
        };

        if let Some(frame) = frame {
            if self.renderer.draw(&mut self.gpu, frame, self.refresh) {
                self.stats.draws += 1;
                if is_delayed {
                    if let Some(initial) = self.initial.take() {
                        release_frame(&mut self.pool, &mut self.gpu, initial);
                    }
                }
            }
        }

        self.subtitles
            .render(&mut self.painter, self.overlay_size.x, self.overlay_size.y);
    }

    fn redraw_shown(&mut self) {
        if let Some(frame) = self.delayed.as_ref().or(self.initial.as_ref()) {
            if self.renderer.draw(&mut self.gpu, frame, self.refresh) {
                self.stats.draws += 1;
            }
        }
        self.subtitles
            .render(&mut self.painter, self.overlay_size.x, self.overlay_size.y);
    }

    /// Decoded-frame hook: capture the element's current picture and
    /// captions. Returns whether a frame was captured.
    pub fn on_decoded_frame<E, D>(&mut self, element: &E, doc: &D, now: Timestamp) -> bool
    where
        E: MediaElement + ?Sized,
        D: CaptionDocument + ?Sized,
    {
        if !self.active || !self.visible {
            return false;
        }
        if element.is_paused() || element.is_ended() {
            return false;
        }

        let ended_armed = matches!(
            self.countdown,
            Some(Countdown {
                kind: CountdownKind::Ended,
                ..
            })
        );
        if matches!(self.phase, Phase::Draining { .. }) || ended_armed {
            self.reset("playback resumed");
        } else if self.countdown.take().is_some() {
            debug!(element = %self.id, "playback resumed before countdown expired");
        }

        let mark = Mark::new(now, self.refresh);
        let Some(frame) = self
            .capture
            .capture(&mut self.gpu, &mut self.pool, element, now, self.refresh)
        else {
            return false;
        };
        self.stats.captures += 1;
        let sequence = frame.sequence;

        match self.phase {
            Phase::Priming | Phase::Reset => {
                if let Some(stale) = self.initial.replace(frame) {
                    release_frame(&mut self.pool, &mut self.gpu, stale);
                }
                self.baseline = Some(mark);
                self.phase = Phase::Steady;
                debug!(element = %self.id, sequence, "primed initial frame");
            }
            _ => self.frames.push(sequence, mark, self.delay, frame),
        }

        if let Some(snapshot) = self.subtitles.sample(doc) {
            self.captions.push(sequence, mark, self.delay, snapshot);
        }
        true
    }

    /// Change the delay in place. A shorter delay drops every frame in
    /// flight; they are released when due instead of shown.
    pub fn update_delay(&mut self, delay: Delay) {
        if delay == self.delay {
            return;
        }
        let shorter = delay < self.delay;
        self.delay = delay;

        if shorter && self.phase == Phase::Steady {
            let newest = self
                .frames
                .newest_sequence()
                .into_iter()
                .chain(self.captions.newest_sequence())
                .max();
            if let Some(newest) = newest {
                self.watermark = self.watermark.max(newest);
                self.subtitles.reset_sampling();
            }
        }
        info!(element = %self.id, %delay, watermark = self.watermark, "delay updated");
    }

    /// Page visibility change. Returning from hidden drops stale frames.
    pub fn set_visible(&mut self, visible: bool) {
        if !self.active || self.visible == visible {
            return;
        }
        self.visible = visible;
        self.timing.break_cadence();
        if visible && matches!(self.phase, Phase::Steady | Phase::Draining { .. }) {
            self.reset("page visible again");
        }
    }

    /// The element's box or intrinsic size changed.
    pub fn resize(&mut self, plan: &OverlayPlan) {
        if !self.active {
            return;
        }
        let (width, height) = plan.video.backing;
        self.gpu.resize(width, height);
        self.overlay_size = plan.subtitle_css_size();
        self.renderer.invalidate();
        self.subtitles.mark_dirty();
        self.needs_redraw = true;
    }

    fn reset(&mut self, reason: &'static str) {
        self.watermark = self.watermark.max(self.capture.last_sequence());
        self.release_all();
        self.baseline = None;
        self.countdown = None;
        self.needs_redraw = false;
        self.subtitles.reset_sampling();
        self.phase = Phase::Reset;
        debug!(element = %self.id, watermark = self.watermark, reason, "scheduler reset");
    }

    fn release_all(&mut self) {
        if let Some(frame) = self.initial.take() {
            release_frame(&mut self.pool, &mut self.gpu, frame);
        }
        if let Some(frame) = self.delayed.take() {
            release_frame(&mut self.pool, &mut self.gpu, frame);
        }
        for frame in self.frames.drain() {
            release_frame(&mut self.pool, &mut self.gpu, frame);
        }
        self.captions.drain().for_each(drop);
    }

    /// Stop all work and restore native captions. GPU resources are deleted
    /// once the drain bound has passed (see [`Self::poll_teardown`]).
    /// Returns `false` if already detached.
    pub fn detach<D: CaptionDocument + ?Sized>(&mut self, doc: &mut D, now: Timestamp) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.release_all();
        self.subtitles.detach(doc);
        self.painter.clear();
        self.baseline = None;
        self.countdown = None;
        self.phase = Phase::Detached;
        self.teardown.begin(now + self.drain_bound);
        info!(
            element = %self.id,
            captures = self.stats.captures,
            promotions = self.stats.promotions,
            discards = self.stats.discards,
            "delay scheduler detached"
        );
        true
    }

    /// Delete GPU resources once the drain bound has passed. Returns `true`
    /// on the call that deleted them.
    pub fn poll_teardown(&mut self, now: Timestamp) -> bool {
        if self.teardown.poll(now) {
            self.destroy_resources();
            true
        } else {
            false
        }
    }

    /// Delete GPU resources without waiting.
    pub fn force_teardown(&mut self) -> bool {
        if self.teardown.force() {
            self.destroy_resources();
            true
        } else {
            false
        }
    }

    fn destroy_resources(&mut self) {
        self.pool.destroy_all(&mut self.gpu);
        self.renderer.destroy(&mut self.gpu);
        self.gpu.lose_context();
        debug!(element = %self.id, "GPU resources released");
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn delay(&self) -> Delay {
        self.delay
    }

    pub fn timing_mode(&self) -> TimingMode {
        self.timing.mode()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_torn_down(&self) -> bool {
        self.teardown.is_finished()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh
    }

    pub fn baseline(&self) -> Option<Mark> {
        self.baseline
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    pub fn countdown(&self) -> Option<Countdown> {
        self.countdown
    }

    pub fn initial_frame(&self) -> Option<&Frame> {
        self.initial.as_ref()
    }

    /// Frame currently on screen after the delay.
    pub fn delayed_frame(&self) -> Option<&Frame> {
        self.delayed.as_ref()
    }

    /// Newest frame in flight.
    pub fn current_sequence(&self) -> Option<u64> {
        self.frames.newest_sequence()
    }

    pub fn in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Frames currently holding a texture.
    pub fn held_frames(&self) -> usize {
        self.frames.len() + usize::from(self.initial.is_some()) + usize::from(self.delayed.is_some())
    }

    pub fn pool(&self) -> &TexturePool {
        &self.pool
    }

    pub fn subtitles(&self) -> &SubtitlePipeline {
        &self.subtitles
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn painter(&self) -> &P {
        &self.painter
    }
}
