//! Geometry for placing overlay surfaces over a media element.

use glam::{Affine2, Mat2};
use serde::{Deserialize, Serialize};

/// 2D vector.
pub type Vec2 = glam::Vec2;

/// Axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Right edge.
    #[inline]
    pub fn right(self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(self) -> f32 {
        self.y + self.height
    }

    /// Rectangle scaled by a device pixel ratio, rounded to whole pixels.
    pub fn to_device_pixels(self, device_pixel_ratio: f32) -> (u32, u32) {
        let dpr = if device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        (
            (self.width * dpr).round().max(0.0) as u32,
            (self.height * dpr).round().max(0.0) as u32,
        )
    }
}

/// 2D affine transform, as carried by a CSS `matrix(a, b, c, d, e, f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    inner: Affine2,
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        inner: Affine2::IDENTITY,
    };

    /// Build from CSS matrix components.
    pub fn from_css_matrix(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self {
            inner: Affine2::from_mat2_translation(
                Mat2::from_cols(Vec2::new(a, b), Vec2::new(c, d)),
                Vec2::new(e, f),
            ),
        }
    }

    /// Components in CSS `matrix()` order.
    pub fn to_css_matrix(self) -> [f32; 6] {
        let m = self.inner.matrix2;
        let t = self.inner.translation;
        [m.x_axis.x, m.x_axis.y, m.y_axis.x, m.y_axis.y, t.x, t.y]
    }

    pub fn is_identity(self) -> bool {
        self.inner == Affine2::IDENTITY
    }

    pub fn transform_point(self, point: Vec2) -> Vec2 {
        self.inner.transform_point2(point)
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Serialize for Transform2D {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_css_matrix().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Transform2D {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [a, b, c, d, e, f] = <[f32; 6]>::deserialize(deserializer)?;
        Ok(Self::from_css_matrix(a, b, c, d, e, f))
    }
}
