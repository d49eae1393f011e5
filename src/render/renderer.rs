//! Command interpreter: replays [`DrawCommand`] batches onto a [`Context2d`].

use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::{Rc, Weak};

use crate::assets::image_cache::ImageCache;
use crate::foundation::core::{Affine, DirtyRect, FillRule};
use crate::foundation::error::{ReelError, ReelResult};
use crate::paths::path2d::Path2D;
use crate::paths::registry::{HitTest, PathRegistry};
use crate::protocol::command::{DrawCommand, PathHandle, PixelData};
use crate::protocol::style::{GradientStop, StyleDescriptor, StyleValue};
use crate::render::color::format_set_color;
use crate::render::context::{
    CanvasGradient, Context2d, ImageData, Paint, Surface, image_data_len,
};

/// Renderer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererOpts {
    pub(crate) default_font_size: f64,
    pub(crate) default_font_family: String,
}

impl Default for RendererOpts {
    fn default() -> Self {
        Self {
            default_font_size: 16.0,
            default_font_family: "sans-serif".to_owned(),
        }
    }
}

impl RendererOpts {
    /// Font size in pixels used until a `setFontSize` command arrives.
    pub fn with_default_font_size(mut self, size: f64) -> Self {
        if size.is_finite() && size > 0.0 {
            self.default_font_size = size;
        }
        self
    }

    /// Font family used until a `setFontFamily` command arrives.
    pub fn with_default_font_family(mut self, family: impl Into<String>) -> Self {
        self.default_font_family = family.into();
        self
    }
}

#[derive(Clone, Debug)]
struct FontState {
    size: f64,
    family: String,
}

impl FontState {
    fn css(&self) -> String {
        format!("{}px {}", self.size, self.family)
    }
}

enum StyleTarget {
    Fill,
    Stroke,
}

/// Replays draw commands onto a live drawing context.
///
/// The context is shared (`Rc<RefCell<_>>`) with the hit tester handed out by
/// [`Renderer::hit_tester`]; nothing else holds it.
pub struct Renderer<C: Context2d> {
    ctx: Rc<RefCell<C>>,
    images: Option<ImageCache>,
    paths: Option<Rc<RefCell<PathRegistry>>>,
    font: FontState,
}

impl<C: Context2d> std::fmt::Debug for Renderer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("has_images", &self.images.is_some())
            .field("has_paths", &self.paths.is_some())
            .field("font", &self.font)
            .finish()
    }
}

impl<C: Context2d> Renderer<C> {
    /// Acquire a context from `surface`.
    ///
    /// Fails with [`ReelError::Context`] when the surface cannot produce one; that is the only
    /// fatal error of the render path.
    pub fn new<S>(surface: &mut S, images: Option<ImageCache>) -> ReelResult<Self>
    where
        S: Surface<Context = C>,
    {
        Self::with_opts(surface, images, RendererOpts::default())
    }

    /// Like [`Renderer::new`] with explicit options.
    pub fn with_opts<S>(
        surface: &mut S,
        images: Option<ImageCache>,
        opts: RendererOpts,
    ) -> ReelResult<Self>
    where
        S: Surface<Context = C>,
    {
        let ctx = surface
            .context_2d()
            .ok_or_else(|| ReelError::context("surface did not provide a 2d context"))?;
        Ok(Self {
            ctx: Rc::new(RefCell::new(ctx)),
            images,
            paths: None,
            font: FontState {
                size: opts.default_font_size,
                family: opts.default_font_family,
            },
        })
    }

    /// Install (or remove) the registry used to resolve `fillPath`/`strokePath`/`clipPath`.
    pub fn set_paths(&mut self, paths: Option<Rc<RefCell<PathRegistry>>>) {
        self.paths = paths;
    }

    /// The shared drawing context.
    pub fn context(&self) -> &Rc<RefCell<C>> {
        &self.ctx
    }

    /// Image cache used by `drawImage` and pattern styles.
    pub fn images(&self) -> Option<&ImageCache> {
        self.images.as_ref()
    }

    /// Apply every command once, in order.
    ///
    /// Never fails: unknown commands, unknown handles and missing images are skipped.
    #[tracing::instrument(skip_all, fields(len = commands.len()))]
    pub fn render(&mut self, commands: &[DrawCommand]) {
        let shared = Rc::clone(&self.ctx);
        let Ok(mut ctx) = shared.try_borrow_mut() else {
            tracing::warn!("context busy; dropping batch");
            return;
        };
        for cmd in commands {
            self.apply(&mut *ctx, cmd);
        }
    }

    fn apply(&mut self, ctx: &mut C, cmd: &DrawCommand) {
        match cmd {
            DrawCommand::Clear => ctx.clear(),
            DrawCommand::ClearRect {
                x,
                y,
                width,
                height,
            } => ctx.clear_rect(*x, *y, *width, *height),

            DrawCommand::Rect {
                x,
                y,
                width,
                height,
            } => ctx.stroke_rect(*x, *y, *width, *height),
            DrawCommand::FillRect {
                x,
                y,
                width,
                height,
            } => ctx.fill_rect(*x, *y, *width, *height),
            DrawCommand::Circle { x, y, radius } => {
                ctx.begin_path();
                ctx.arc(*x, *y, *radius, 0.0, TAU, false);
                ctx.stroke();
            }
            DrawCommand::FillCircle { x, y, radius } => {
                ctx.begin_path();
                ctx.arc(*x, *y, *radius, 0.0, TAU, false);
                ctx.fill(FillRule::NonZero);
            }
            DrawCommand::Line { x1, y1, x2, y2 } => {
                ctx.begin_path();
                ctx.move_to(*x1, *y1);
                ctx.line_to(*x2, *y2);
                ctx.stroke();
            }
            DrawCommand::Text {
                text,
                x,
                y,
                font_size,
                font_family,
            } => self.draw_text(ctx, text, *x, *y, *font_size, font_family.as_deref()),
            DrawCommand::DrawImage {
                name,
                x,
                y,
                width,
                height,
            } => {
                let Some(image) = self.images.as_ref().and_then(|c| c.get(name)) else {
                    tracing::debug!(name = name.as_str(), "drawImage: image not cached");
                    return;
                };
                let size = match (width, height) {
                    (Some(w), Some(h)) => Some((*w, *h)),
                    (Some(w), None) => Some((*w, f64::from(image.height))),
                    (None, Some(h)) => Some((f64::from(image.width), *h)),
                    (None, None) => None,
                };
                ctx.draw_image(&image, *x, *y, size);
            }

            DrawCommand::Translate { x, y } => ctx.translate(*x, *y),
            DrawCommand::Rotate { angle } => ctx.rotate(*angle),
            DrawCommand::Scale { x, y } => ctx.scale(*x, *y),
            DrawCommand::Save => ctx.save(),
            DrawCommand::Restore => ctx.restore(),
            DrawCommand::Transform { a, b, c, d, e, f } => {
                ctx.transform(Affine::new([*a, *b, *c, *d, *e, *f]))
            }
            DrawCommand::SetTransform { a, b, c, d, e, f } => {
                ctx.set_transform(Affine::new([*a, *b, *c, *d, *e, *f]))
            }
            DrawCommand::ResetTransform => ctx.reset_transform(),

            DrawCommand::BeginPath => ctx.begin_path(),
            DrawCommand::ClosePath => ctx.close_path(),
            DrawCommand::MoveTo { x, y } => ctx.move_to(*x, *y),
            DrawCommand::LineTo { x, y } => ctx.line_to(*x, *y),
            DrawCommand::Arc {
                x,
                y,
                radius,
                start_angle,
                end_angle,
                counterclockwise,
            } => ctx.arc(
                *x,
                *y,
                *radius,
                *start_angle,
                *end_angle,
                counterclockwise.unwrap_or(false),
            ),
            DrawCommand::ArcTo {
                x1,
                y1,
                x2,
                y2,
                radius,
            } => ctx.arc_to(*x1, *y1, *x2, *y2, *radius),
            DrawCommand::Ellipse {
                x,
                y,
                radius_x,
                radius_y,
                rotation,
                start_angle,
                end_angle,
                counterclockwise,
            } => ctx.ellipse(
                *x,
                *y,
                *radius_x,
                *radius_y,
                *rotation,
                *start_angle,
                *end_angle,
                counterclockwise.unwrap_or(false),
            ),
            DrawCommand::QuadraticCurveTo { cpx, cpy, x, y } => {
                ctx.quadratic_curve_to(*cpx, *cpy, *x, *y)
            }
            DrawCommand::BezierCurveTo {
                cp1x,
                cp1y,
                cp2x,
                cp2y,
                x,
                y,
            } => ctx.bezier_curve_to(*cp1x, *cp1y, *cp2x, *cp2y, *x, *y),
            DrawCommand::RoundRect {
                x,
                y,
                width,
                height,
                radii,
            } => ctx.round_rect(*x, *y, *width, *height, radii.corners()),
            DrawCommand::Fill { fill_rule } => ctx.fill(fill_rule.unwrap_or_default()),
            DrawCommand::Stroke => ctx.stroke(),
            DrawCommand::Clip { fill_rule } => ctx.clip(fill_rule.unwrap_or_default()),

            DrawCommand::FillPath { id, fill_rule } => {
                self.with_stored_path(*id, |p| ctx.fill_path(p, fill_rule.unwrap_or_default()))
            }
            DrawCommand::StrokePath { id, .. } => self.with_stored_path(*id, |p| ctx.stroke_path(p)),
            DrawCommand::ClipPath { id, fill_rule } => {
                self.with_stored_path(*id, |p| ctx.clip_path(p, fill_rule.unwrap_or_default()))
            }

            DrawCommand::SetColor { r, g, b, a } => {
                let color = format_set_color(*r, *g, *b, *a);
                ctx.set_fill_style(Paint::Color(color.clone()));
                ctx.set_stroke_style(Paint::Color(color));
            }
            DrawCommand::SetFillStyle { style } => self.apply_style(ctx, style, StyleTarget::Fill),
            DrawCommand::SetStrokeStyle { style } => {
                self.apply_style(ctx, style, StyleTarget::Stroke)
            }

            DrawCommand::SetShadowColor { color } => ctx.set_shadow_color(color),
            DrawCommand::SetShadowBlur { blur } => ctx.set_shadow_blur(*blur),
            DrawCommand::SetShadowOffsetX { offset } => ctx.set_shadow_offset_x(*offset),
            DrawCommand::SetShadowOffsetY { offset } => ctx.set_shadow_offset_y(*offset),
            DrawCommand::SetShadow {
                color,
                blur,
                offset_x,
                offset_y,
            } => {
                ctx.set_shadow_color(color);
                ctx.set_shadow_blur(*blur);
                ctx.set_shadow_offset_x(*offset_x);
                ctx.set_shadow_offset_y(*offset_y);
            }
            DrawCommand::ClearShadow => {
                ctx.set_shadow_color("rgba(0, 0, 0, 0)");
                ctx.set_shadow_blur(0.0);
                ctx.set_shadow_offset_x(0.0);
                ctx.set_shadow_offset_y(0.0);
            }

            DrawCommand::SetGlobalAlpha { alpha } => ctx.set_global_alpha(*alpha),
            DrawCommand::SetCompositeOperation { operation } => {
                ctx.set_global_composite_operation(operation)
            }
            DrawCommand::SetTextAlign { align } => ctx.set_text_align(*align),
            DrawCommand::SetTextBaseline { baseline } => ctx.set_text_baseline(*baseline),
            DrawCommand::SetFontSize { size } => {
                if !(size.is_finite() && *size > 0.0) {
                    tracing::debug!(size, "ignoring invalid font size");
                    return;
                }
                self.font.size = *size;
                ctx.set_font(&self.font.css());
            }
            DrawCommand::SetFontFamily { family } => {
                self.font.family.clone_from(family);
                ctx.set_font(&self.font.css());
            }

            DrawCommand::SetLineWidth { width } => ctx.set_line_width(*width),
            DrawCommand::SetLineCap { cap } => ctx.set_line_cap(*cap),
            DrawCommand::SetLineJoin { join } => ctx.set_line_join(*join),
            DrawCommand::SetMiterLimit { limit } => ctx.set_miter_limit(*limit),
            DrawCommand::SetLineDash { segments } => ctx.set_line_dash(segments),
            DrawCommand::SetLineDashOffset { offset } => ctx.set_line_dash_offset(*offset),

            DrawCommand::PutImageData {
                data,
                width,
                height,
                dx,
                dy,
                ..
            } => {
                if let Some(image) = image_data_from(data, *width, *height) {
                    ctx.put_image_data(&image, to_long(*dx), to_long(*dy), cmd.dirty_rect());
                }
            }

            DrawCommand::Unknown => tracing::debug!("skipping unknown draw command"),
        }
    }

    fn draw_text(
        &self,
        ctx: &mut C,
        text: &str,
        x: f64,
        y: f64,
        size: Option<f64>,
        family: Option<&str>,
    ) {
        if size.is_none() && family.is_none() {
            ctx.fill_text(text, x, y);
            return;
        }
        let call = FontState {
            size: size.unwrap_or(self.font.size),
            family: family.map_or_else(|| self.font.family.clone(), str::to_owned),
        };
        ctx.set_font(&call.css());
        ctx.fill_text(text, x, y);
        ctx.set_font(&self.font.css());
    }

    fn apply_style(&self, ctx: &mut C, style: &StyleValue, target: StyleTarget) {
        let paint = match style {
            StyleValue::Color(c) => Paint::Color(c.clone()),
            StyleValue::Descriptor(d) => match d {
                StyleDescriptor::Solid { color } => Paint::Color(color.clone()),
                StyleDescriptor::Linear {
                    x0,
                    y0,
                    x1,
                    y1,
                    stops,
                } => {
                    let g = ctx.create_linear_gradient(*x0, *y0, *x1, *y1);
                    Paint::Gradient(with_stops(g, stops))
                }
                StyleDescriptor::Radial {
                    x0,
                    y0,
                    r0,
                    x1,
                    y1,
                    r1,
                    stops,
                } => {
                    let g = ctx.create_radial_gradient(*x0, *y0, *r0, *x1, *y1, *r1);
                    Paint::Gradient(with_stops(g, stops))
                }
                StyleDescriptor::Conic {
                    start_angle,
                    x,
                    y,
                    stops,
                } => {
                    let g = ctx.create_conic_gradient(*start_angle, *x, *y);
                    Paint::Gradient(with_stops(g, stops))
                }
                StyleDescriptor::Pattern { image, repetition } => {
                    let Some(img) = self.images.as_ref().and_then(|c| c.get(image)) else {
                        tracing::debug!(name = image.as_str(), "pattern: image not cached");
                        return;
                    };
                    Paint::Pattern(ctx.create_pattern(&img, *repetition))
                }
            },
        };
        match target {
            StyleTarget::Fill => ctx.set_fill_style(paint),
            StyleTarget::Stroke => ctx.set_stroke_style(paint),
        }
    }

    fn with_stored_path(&self, id: PathHandle, f: impl FnOnce(&Path2D)) {
        let Some(paths) = self.paths.as_ref() else {
            tracing::debug!(id = id.0, "path command without a registry");
            return;
        };
        let Ok(reg) = paths.try_borrow() else {
            tracing::warn!(id = id.0, "path registry busy; skipping path command");
            return;
        };
        match reg.get_path(id) {
            Some(path) => f(path),
            None => tracing::debug!(id = id.0, "path command for unknown handle"),
        }
    }

    /// Fill hit test in device coordinates against the current transform.
    pub fn is_point_in_path(
        &self,
        path: &Path2D,
        x: f64,
        y: f64,
        fill_rule: Option<FillRule>,
    ) -> bool {
        self.ctx
            .try_borrow()
            .is_ok_and(|ctx| ctx.is_point_in_path(path, x, y, fill_rule.unwrap_or_default()))
    }

    /// Stroke hit test in device coordinates against the current transform and line style.
    pub fn is_point_in_stroke(&self, path: &Path2D, x: f64, y: f64) -> bool {
        self.ctx
            .try_borrow()
            .is_ok_and(|ctx| ctx.is_point_in_stroke(path, x, y))
    }

    /// Read back straight RGBA pixels.
    pub fn get_image_data(&self, x: i32, y: i32, width: u32, height: u32) -> ImageData {
        match self.ctx.try_borrow_mut() {
            Ok(mut ctx) => ctx.get_image_data(x, y, width, height),
            Err(_) => ImageData::new(width, height),
        }
    }

    /// Write raw pixels in either encoding.
    ///
    /// `data` is copied, never modified; a length other than `width * height * 4` is zero-padded
    /// or truncated. Sizes past [`MAX_IMAGE_DATA_BYTES`](crate::MAX_IMAGE_DATA_BYTES) are skipped.
    pub fn put_image_data(
        &self,
        data: &PixelData,
        width: u32,
        height: u32,
        dx: i32,
        dy: i32,
        dirty: Option<DirtyRect>,
    ) {
        let Some(image) = image_data_from(data, width, height) else {
            return;
        };
        if let Ok(mut ctx) = self.ctx.try_borrow_mut() {
            ctx.put_image_data(&image, dx, dy, dirty);
        }
    }

    /// Blank pixel buffer of the given size.
    pub fn create_image_data(&self, width: u32, height: u32) -> ImageData {
        match self.ctx.try_borrow() {
            Ok(ctx) => ctx.create_image_data(width, height),
            Err(_) => ImageData::new(width, height),
        }
    }
}

impl<C: Context2d + 'static> Renderer<C> {
    /// Hit-test capability for the path registry.
    ///
    /// The tester holds a weak reference to the context: once the renderer is dropped, or while
    /// the context is borrowed, it answers `false`.
    pub fn hit_tester(&self) -> Rc<dyn HitTest> {
        Rc::new(ContextHitTest {
            ctx: Rc::downgrade(&self.ctx),
        })
    }
}

struct ContextHitTest<C> {
    ctx: Weak<RefCell<C>>,
}

impl<C: Context2d> HitTest for ContextHitTest<C> {
    fn is_point_in_path(&self, path: &Path2D, x: f64, y: f64, fill_rule: FillRule) -> bool {
        let Some(ctx) = self.ctx.upgrade() else {
            return false;
        };
        ctx.try_borrow()
            .is_ok_and(|c| c.is_point_in_path(path, x, y, fill_rule))
    }

    fn is_point_in_stroke(&self, path: &Path2D, x: f64, y: f64) -> bool {
        let Some(ctx) = self.ctx.upgrade() else {
            return false;
        };
        ctx.try_borrow()
            .is_ok_and(|c| c.is_point_in_stroke(path, x, y))
    }
}

fn with_stops(mut g: CanvasGradient, stops: &[GradientStop]) -> CanvasGradient {
    for stop in stops {
        g.add_color_stop(stop.offset, &stop.color);
    }
    g
}

fn image_data_from(data: &PixelData, width: u32, height: u32) -> Option<ImageData> {
    let Some(len) = image_data_len(width, height) else {
        tracing::debug!(width, height, "putImageData too large; skipped");
        return None;
    };
    if data.len() != len {
        tracing::debug!(got = data.len(), expected = len, "pixel data length mismatch");
    }
    Some(ImageData {
        width,
        height,
        data: data.to_bytes(len),
    })
}

// WebIDL `long` conversion for destination offsets: truncate, non-finite becomes 0.
fn to_long(v: f64) -> i32 {
    if v.is_finite() { v.trunc() as i32 } else { 0 }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
