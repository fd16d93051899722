//! Per-element subtitle pipeline: sample the native captions on each decoded
//! frame, hold the delayed snapshot, repaint the overlay when it changes.
//!
//! Delaying is not done here. The scheduler queues sampled snapshots next
//! to the frames so captions are promoted on exactly the same refresh as
//! the picture they belong to.

use crate::layout::{layout, paint, SubtitlePainter};
use crate::line::SubtitleSnapshot;
use crate::source::{CaptionDocument, CaptionFormat, CaptionSource};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct SubtitlePipeline {
    source: Option<CaptionSource>,
    last_sampled: Option<SubtitleSnapshot>,
    delayed: Option<SubtitleSnapshot>,
    dirty: bool,
}

impl SubtitlePipeline {
    /// Detect a caption source and hide its native rendering. Without a
    /// supported source the pipeline stays inert and native captions are
    /// left alone.
    pub fn attach<D: CaptionDocument + ?Sized>(doc: &mut D) -> Self {
        Self {
            source: CaptionSource::attach(doc),
            ..Self::default()
        }
    }

    /// A pipeline that never samples.
    pub fn inert() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    pub fn format(&self) -> Option<CaptionFormat> {
        self.source.as_ref().map(CaptionSource::format)
    }

    /// Sample the captions. Returns a snapshot only when the segments
    /// differ from the previous sample.
    pub fn sample<D: CaptionDocument + ?Sized>(&mut self, doc: &D) -> Option<SubtitleSnapshot> {
        let source = self.source.as_ref()?;
        let lines = source.sample(doc);
        if self
            .last_sampled
            .as_deref()
            .is_some_and(|last| last == lines.as_slice())
        {
            return None;
        }
        let snapshot: SubtitleSnapshot = Arc::from(lines);
        self.last_sampled = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Install the snapshot that is due now.
    pub fn set_delayed(&mut self, snapshot: SubtitleSnapshot) {
        let changed = self
            .delayed
            .as_ref()
            .map_or(true, |current| !Arc::ptr_eq(current, &snapshot) && **current != *snapshot);
        if changed {
            self.delayed = Some(snapshot);
            self.dirty = true;
        }
    }

    pub fn delayed(&self) -> Option<&SubtitleSnapshot> {
        self.delayed.as_ref()
    }

    /// Force a repaint on the next render (after a resize).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Repaint the overlay if anything changed. `width` and `height` are the
    /// overlay box in CSS pixels. Returns whether the painter was touched.
    pub fn render<P: SubtitlePainter + ?Sized>(
        &mut self,
        painter: &mut P,
        width: f32,
        height: f32,
    ) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        painter.clear();
        if let Some(snapshot) = &self.delayed {
            if !snapshot.is_empty() {
                let laid_out = layout(snapshot, width, height, &*painter);
                paint(&laid_out, painter);
            }
        }
        true
    }

    /// Drop the delayed captions and clear the overlay.
    pub fn clear<P: SubtitlePainter + ?Sized>(&mut self, painter: &mut P) {
        self.delayed = None;
        self.last_sampled = None;
        self.dirty = false;
        painter.clear();
    }

    /// Forget sampled state so the next sample is reported even if unchanged.
    pub fn reset_sampling(&mut self) {
        self.last_sampled = None;
    }

    /// Restore native captions and drop everything held.
    pub fn detach<D: CaptionDocument + ?Sized>(&mut self, doc: &mut D) {
        if let Some(mut source) = self.source.take() {
            source.restore(doc);
        }
        self.last_sampled = None;
        self.delayed = None;
        self.dirty = false;
    }
}
