//! Overlay surface placement.
//!
//! Two surfaces cover each delayed element: the video surface, whose
//! backing store matches the intrinsic video size, and the subtitle
//! surface, whose backing store is the CSS box scaled by the device pixel
//! ratio. Both copy the element's box and transform.

use serde::{Deserialize, Serialize};
use timeshift_core::{Rect, Transform2D, Vec2};

/// Where a media element is drawn by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementLayout {
    /// Content box in CSS pixels.
    pub rect: Rect,
    pub transform: Transform2D,
    pub device_pixel_ratio: f32,
    /// Intrinsic video width and height; zero before metadata.
    pub video_size: (u32, u32),
}

impl Default for ElementLayout {
    fn default() -> Self {
        Self {
            rect: Rect::default(),
            transform: Transform2D::IDENTITY,
            device_pixel_ratio: 1.0,
            video_size: (0, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    Video,
    Subtitles,
}

/// One overlay surface's placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlacement {
    pub kind: SurfaceKind,
    pub rect: Rect,
    pub transform: Transform2D,
    /// Backing store size in device pixels.
    pub backing: (u32, u32),
}

/// Both surfaces for one element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlan {
    pub video: OverlayPlacement,
    pub subtitles: OverlayPlacement,
}

impl OverlayPlan {
    pub fn for_layout(layout: &ElementLayout) -> Self {
        let box_pixels = layout.rect.to_device_pixels(layout.device_pixel_ratio);
        let video_backing = match layout.video_size {
            (0, _) | (_, 0) => box_pixels,
            size => size,
        };
        Self {
            video: OverlayPlacement {
                kind: SurfaceKind::Video,
                rect: layout.rect,
                transform: layout.transform,
                backing: video_backing,
            },
            subtitles: OverlayPlacement {
                kind: SurfaceKind::Subtitles,
                rect: layout.rect,
                transform: layout.transform,
                backing: box_pixels,
            },
        }
    }

    /// Subtitle overlay size in CSS pixels; layout happens in this space.
    pub fn subtitle_css_size(&self) -> Vec2 {
        self.subtitles.rect.size()
    }
}
