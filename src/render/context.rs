//! The native drawing surface the renderer talks to.
//!
//! [`Context2d`] mirrors the subset of the HTML canvas 2D API that draw commands map onto. The
//! renderer only ever calls through this trait, so tests can swap in a recording context and the
//! CLI uses the `vello_cpu` backend in [`crate::render::cpu`].

use std::sync::Arc;

use crate::assets::image_cache::RasterImage;
use crate::foundation::core::{Affine, DirtyRect, FillRule};
use crate::paths::path2d::Path2D;
use crate::protocol::command::{LineCap, LineJoin, TextAlign, TextBaseline};
use crate::protocol::style::Repetition;

/// Something that can hand out a drawing context.
pub trait Surface {
    /// Context type produced by this surface.
    type Context: Context2d;

    /// Acquire the drawing context, or `None` when the surface cannot draw.
    fn context_2d(&mut self) -> Option<Self::Context>;
}

/// Geometry of a canvas gradient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientKind {
    /// Along the line `(x0, y0) → (x1, y1)`.
    Linear {
        /// Start x.
        x0: f64,
        /// Start y.
        y0: f64,
        /// End x.
        x1: f64,
        /// End y.
        y1: f64,
    },
    /// Between two circles.
    Radial {
        /// Start circle center x.
        x0: f64,
        /// Start circle center y.
        y0: f64,
        /// Start circle radius.
        r0: f64,
        /// End circle center x.
        x1: f64,
        /// End circle center y.
        y1: f64,
        /// End circle radius.
        r1: f64,
    },
    /// Around a center, starting at `start_angle`.
    Conic {
        /// Angle of the first stop, in radians.
        start_angle: f64,
        /// Center x.
        x: f64,
        /// Center y.
        y: f64,
    },
}

/// A gradient value built by a context, with its color stops.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasGradient {
    /// Gradient geometry.
    pub kind: GradientKind,
    /// `(offset, css color)` pairs in insertion order.
    pub stops: Vec<(f64, String)>,
}

impl CanvasGradient {
    /// Gradient with no stops.
    pub fn new(kind: GradientKind) -> Self {
        Self {
            kind,
            stops: Vec::new(),
        }
    }

    /// Append a stop. Offsets outside `[0, 1]` are dropped.
    pub fn add_color_stop(&mut self, offset: f64, color: &str) {
        if !(0.0..=1.0).contains(&offset) {
            tracing::debug!(offset, "gradient stop offset out of range");
            return;
        }
        self.stops.push((offset, color.to_owned()));
    }
}

/// An image repeated as a paint.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasPattern {
    /// Source image.
    pub image: Arc<RasterImage>,
    /// Tiling mode.
    pub repetition: Repetition,
}

/// Fill or stroke paint.
#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    /// CSS color string.
    Color(String),
    /// Gradient.
    Gradient(CanvasGradient),
    /// Image pattern.
    Pattern(CanvasPattern),
}

impl From<&str> for Paint {
    fn from(s: &str) -> Self {
        Self::Color(s.to_owned())
    }
}

/// Straight (non-premultiplied) RGBA8 pixels, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

/// Largest pixel buffer, in bytes, a single image data value may hold (8192 x 8192 RGBA).
pub const MAX_IMAGE_DATA_BYTES: usize = 1 << 28;

/// Byte length of a `width x height` RGBA8 buffer, or `None` when it overflows or exceeds
/// [`MAX_IMAGE_DATA_BYTES`].
pub(crate) fn image_data_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
        .filter(|&len| len <= MAX_IMAGE_DATA_BYTES)
}

impl ImageData {
    /// Transparent black buffer.
    ///
    /// Sizes past [`MAX_IMAGE_DATA_BYTES`] yield an empty `0 x 0` buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::try_new(width, height).unwrap_or_else(|| {
            tracing::debug!(width, height, "image data too large; returning an empty buffer");
            Self {
                width: 0,
                height: 0,
                data: Vec::new(),
            }
        })
    }

    /// Transparent black buffer, or `None` when the size is past [`MAX_IMAGE_DATA_BYTES`].
    pub fn try_new(width: u32, height: u32) -> Option<Self> {
        let len = image_data_len(width, height)?;
        Some(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Pixel at `(x, y)` or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// HTML-canvas-style 2D drawing context.
///
/// Every method is total. Out-of-range numbers are clamped or ignored, never reported.
#[allow(clippy::too_many_arguments)]
pub trait Context2d {
    /// Surface width in pixels.
    fn width(&self) -> u32;
    /// Surface height in pixels.
    fn height(&self) -> u32;

    /// Push the drawing state.
    fn save(&mut self);
    /// Pop the drawing state; a no-op on an empty stack.
    fn restore(&mut self);

    /// Translate the current transform.
    fn translate(&mut self, x: f64, y: f64);
    /// Rotate the current transform by `angle` radians.
    fn rotate(&mut self, angle: f64);
    /// Scale the current transform.
    fn scale(&mut self, x: f64, y: f64);
    /// Multiply the current transform by `m`.
    fn transform(&mut self, m: Affine);
    /// Replace the current transform with `m`.
    fn set_transform(&mut self, m: Affine);
    /// Back to the identity transform.
    fn reset_transform(&mut self);

    /// Reset every pixel to transparent black and drop the current path.
    fn clear(&mut self);
    /// Erase a rectangle to transparent black.
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    /// Fill a rectangle without touching the current path.
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    /// Stroke a rectangle without touching the current path.
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Discard the current path.
    fn begin_path(&mut self);
    /// Close the current subpath.
    fn close_path(&mut self);
    /// Start a new subpath at `(x, y)`.
    fn move_to(&mut self, x: f64, y: f64);
    /// Straight segment to `(x, y)`.
    fn line_to(&mut self, x: f64, y: f64);
    /// Circular arc; angles in radians.
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, counterclockwise: bool);
    /// Arc tangent to the lines through the current point, `(x1, y1)` and `(x2, y2)`.
    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64);
    /// Elliptical arc, rotated by `rotation` radians.
    fn ellipse(
        &mut self,
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        start: f64,
        end: f64,
        counterclockwise: bool,
    );
    /// Quadratic Bezier segment.
    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64);
    /// Cubic Bezier segment.
    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64);
    /// Append a closed rectangle subpath.
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    /// `radii` is `[top_left, top_right, bottom_right, bottom_left]`.
    fn round_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radii: [f64; 4]);

    /// Fill the current path.
    fn fill(&mut self, fill_rule: FillRule);
    /// Stroke the current path.
    fn stroke(&mut self);
    /// Intersect the clip region with the current path.
    fn clip(&mut self, fill_rule: FillRule);

    /// Fill a path object instead of the current path.
    fn fill_path(&mut self, path: &Path2D, fill_rule: FillRule);
    /// Stroke a path object instead of the current path.
    fn stroke_path(&mut self, path: &Path2D);
    /// Clip to a path object instead of the current path.
    fn clip_path(&mut self, path: &Path2D, fill_rule: FillRule);

    /// Paint used by fills and text.
    fn set_fill_style(&mut self, paint: Paint);
    /// Paint used by strokes.
    fn set_stroke_style(&mut self, paint: Paint);

    /// Linear gradient between two points.
    fn create_linear_gradient(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) -> CanvasGradient {
        CanvasGradient::new(GradientKind::Linear { x0, y0, x1, y1 })
    }

    /// Radial gradient between two circles.
    fn create_radial_gradient(
        &mut self,
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
    ) -> CanvasGradient {
        CanvasGradient::new(GradientKind::Radial {
            x0,
            y0,
            r0,
            x1,
            y1,
            r1,
        })
    }

    /// Conic gradient around `(x, y)` starting at `start_angle` radians.
    fn create_conic_gradient(&mut self, start_angle: f64, x: f64, y: f64) -> CanvasGradient {
        CanvasGradient::new(GradientKind::Conic { start_angle, x, y })
    }

    /// Pattern that tiles `image` according to `repetition`.
    fn create_pattern(&mut self, image: &Arc<RasterImage>, repetition: Repetition) -> CanvasPattern {
        CanvasPattern {
            image: Arc::clone(image),
            repetition,
        }
    }

    /// Shadow color; a transparent color disables shadows.
    fn set_shadow_color(&mut self, color: &str);
    /// Shadow blur level; negative or non-finite values are ignored.
    fn set_shadow_blur(&mut self, blur: f64);
    /// Horizontal shadow offset, in device pixels.
    fn set_shadow_offset_x(&mut self, offset: f64);
    /// Vertical shadow offset, in device pixels.
    fn set_shadow_offset_y(&mut self, offset: f64);

    /// Global alpha in `[0, 1]`; other values are ignored.
    fn set_global_alpha(&mut self, alpha: f64);
    /// Canvas composite operation name, e.g. `"source-over"` or `"multiply"`.
    fn set_global_composite_operation(&mut self, operation: &str);

    /// Horizontal text anchor.
    fn set_text_align(&mut self, align: TextAlign);
    /// Vertical text anchor.
    fn set_text_baseline(&mut self, baseline: TextBaseline);
    /// CSS font shorthand, as produced by the renderer: `"{size}px {family}"`.
    fn set_font(&mut self, font: &str);
    /// Fill `text` with its anchor at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64);

    /// Stroke width; non-positive or non-finite values are ignored.
    fn set_line_width(&mut self, width: f64);
    /// Cap style for open subpath ends.
    fn set_line_cap(&mut self, cap: LineCap);
    /// Join style between segments.
    fn set_line_join(&mut self, join: LineJoin);
    /// Miter limit; non-positive or non-finite values are ignored.
    fn set_miter_limit(&mut self, limit: f64);
    /// Dash pattern; empty means solid.
    fn set_line_dash(&mut self, segments: &[f64]);
    /// Phase of the dash pattern.
    fn set_line_dash_offset(&mut self, offset: f64);

    /// Draw `image` at `(dx, dy)`, scaled to `size` when given.
    fn draw_image(&mut self, image: &RasterImage, dx: f64, dy: f64, size: Option<(f64, f64)>);

    /// Fill hit test of `path` under the current transform, in device coordinates.
    fn is_point_in_path(&self, path: &Path2D, x: f64, y: f64, fill_rule: FillRule) -> bool;
    /// Stroke hit test of `path` under the current transform and line style.
    fn is_point_in_stroke(&self, path: &Path2D, x: f64, y: f64) -> bool;

    /// Read a rectangle of pixels. Pixels outside the surface read as transparent black.
    fn get_image_data(&mut self, x: i32, y: i32, width: u32, height: u32) -> ImageData;
    /// Write pixels at `(dx, dy)`, ignoring transform, alpha, clip and compositing.
    fn put_image_data(&mut self, image: &ImageData, dx: i32, dy: i32, dirty: Option<DirtyRect>);

    /// Blank transparent buffer of the given size.
    fn create_image_data(&self, width: u32, height: u32) -> ImageData {
        ImageData::new(width, height)
    }
}
