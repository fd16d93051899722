//! Host media elements as seen by the engine.

use crate::overlay::ElementLayout;
use serde::{Deserialize, Serialize};
use timeshift_core::ElementId;
use timeshift_gpu::FrameSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
}

/// A playing media element.
///
/// Implementations are usually cheap handles into the host; the monitor
/// owns one per tracked element and the host mutates state through it.
pub trait MediaElement: FrameSource {
    fn id(&self) -> ElementId;

    fn kind(&self) -> MediaKind;

    fn is_paused(&self) -> bool;

    fn is_ended(&self) -> bool;

    /// Whether the element sits inside one of the engine's own overlays.
    fn is_overlay(&self) -> bool {
        false
    }

    /// Current box, transform and intrinsic size.
    fn layout(&self) -> ElementLayout;

    /// Hide or restore the element's own picture (opacity 0 while delayed
    /// overlays cover it).
    fn set_concealed(&mut self, concealed: bool);
}
