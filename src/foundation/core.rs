pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Rule deciding which regions of a self-intersecting path count as inside.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FillRule {
    /// Inside when the winding number is non-zero.
    #[default]
    NonZero,
    /// Inside when the winding number is odd.
    EvenOdd,
}

impl FillRule {
    /// Decide insideness from a winding number.
    pub fn contains(self, winding: i32) -> bool {
        match self {
            Self::NonZero => winding != 0,
            Self::EvenOdd => winding % 2 != 0,
        }
    }
}

/// Sub-rectangle of a pixel buffer, in buffer coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DirtyRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width; negative values extend to the left.
    pub width: i32,
    /// Height; negative values extend upwards.
    pub height: i32,
}

impl DirtyRect {
    /// Normalize negative extents and clip to a `width x height` buffer.
    ///
    /// Returns `(x0, y0, x1, y1)` with exclusive upper bounds, or `None` when nothing remains.
    pub fn clip_to(self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let (mut x, mut w) = (i64::from(self.x), i64::from(self.width));
        let (mut y, mut h) = (i64::from(self.y), i64::from(self.height));
        if w < 0 {
            x += w;
            w = -w;
        }
        if h < 0 {
            y += h;
            h = -h;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(i64::from(width));
        let y1 = (y + h).min(i64::from(height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
