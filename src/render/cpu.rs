//! `vello_cpu` implementation of [`Context2d`].
//!
//! Drawing is recorded into a `vello_cpu::RenderContext`. Because `vello_cpu` renders into a fresh
//! buffer, the committed pixmap is painted back as the first item of every new recording so
//! compositing operators see the existing pixels. Any pixel read or write commits first.

use std::collections::HashMap;
use std::sync::Arc;

use vello_cpu::peniko::{BlendMode, Compose, Extend, Fill, Mix};

use crate::assets::fonts::FontStore;
use crate::assets::image_cache::RasterImage;
use crate::foundation::core::{Affine, DirtyRect, FillRule, Point, Vec2};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};
use crate::paths::path2d::{CURVE_TOLERANCE, Path2D};
use crate::protocol::command::{LineCap, LineJoin, TextAlign, TextBaseline};
use crate::protocol::style::Repetition;
use crate::render::blur::{blur_rgba8_premul, kernel_radius, shadow_sigma};
use crate::render::color::parse_css_color;
use crate::render::context::{
    CanvasGradient, CanvasPattern, Context2d, GradientKind, ImageData, Paint, Surface,
};
use crate::render::text::{TextLayoutEngine, align_offset, baseline_offset, parse_font};

// Extent used for the unbounded axis of `repeat-x` / `repeat-y` pattern bands.
const BAND_EXTENT: f64 = 1.0e7;

/// Options for [`PixelSurface`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceOpts {
    pub(crate) tolerance: f64,
    pub(crate) clear_rgba: [u8; 4],
}

impl Default for SurfaceOpts {
    fn default() -> Self {
        Self {
            tolerance: CURVE_TOLERANCE,
            clear_rgba: [0, 0, 0, 0],
        }
    }
}

impl SurfaceOpts {
    /// Curve flattening tolerance used for stroke hit testing.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        if tolerance.is_finite() && tolerance > 0.0 {
            self.tolerance = tolerance;
        }
        self
    }

    /// Straight RGBA8 color the surface starts out filled with.
    pub fn with_clear_rgba(mut self, clear: [u8; 4]) -> Self {
        self.clear_rgba = clear;
        self
    }
}

/// In-memory raster surface backed by `vello_cpu`.
#[derive(Clone, Debug)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    opts: SurfaceOpts,
    fonts: FontStore,
}

impl PixelSurface {
    /// Surface of `width x height` pixels with default options.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            opts: SurfaceOpts::default(),
            fonts: FontStore::new(),
        }
    }

    /// Replace the surface options.
    pub fn with_opts(mut self, opts: SurfaceOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Register font bytes under a CSS family name for `text` commands.
    pub fn with_font(mut self, family: &str, bytes: Vec<u8>) -> ReelResult<Self> {
        self.fonts.register(family, bytes)?;
        Ok(self)
    }

    /// Fonts handed to contexts created from now on.
    pub fn fonts_mut(&mut self) -> &mut FontStore {
        &mut self.fonts
    }
}

impl Surface for PixelSurface {
    type Context = CpuContext;

    fn context_2d(&mut self) -> Option<CpuContext> {
        let w = u16::try_from(self.width).ok().filter(|w| *w > 0)?;
        let h = u16::try_from(self.height).ok().filter(|h| *h > 0)?;
        Some(CpuContext::new(w, h, self.opts, self.fonts.clone()))
    }
}

#[derive(Clone)]
enum Brush {
    Solid(vello_cpu::peniko::Color),
    Gradient(vello_cpu::peniko::Gradient),
    Image {
        paint: vello_cpu::Image,
        // Pattern area for non-repeating axes, in pattern space.
        band: Option<vello_cpu::kurbo::Rect>,
    },
}

impl Brush {
    fn black() -> Self {
        Self::Solid(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255))
    }

    fn transparent() -> Self {
        Self::Solid(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Shadow {
    color: [u8; 4],
    blur: f64,
    offset: Vec2,
}

impl Shadow {
    fn none() -> Self {
        Self {
            color: [0, 0, 0, 0],
            blur: 0.0,
            offset: Vec2::ZERO,
        }
    }

    fn active(&self) -> bool {
        self.color[3] > 0 && (self.offset != Vec2::ZERO || self.blur > 0.0)
    }

    fn brush(&self) -> Brush {
        let [r, g, b, a] = self.color;
        Brush::Solid(vello_cpu::peniko::Color::from_rgba8(r, g, b, a))
    }
}

#[derive(Clone, Debug, PartialEq)]
struct LineStyle {
    width: f64,
    cap: LineCap,
    join: LineJoin,
    miter_limit: f64,
    dash: Vec<f64>,
    dash_offset: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            miter_limit: 10.0,
            dash: Vec::new(),
            dash_offset: 0.0,
        }
    }
}

impl LineStyle {
    fn to_kurbo(&self) -> kurbo::Stroke {
        let cap = match self.cap {
            LineCap::Butt => kurbo::Cap::Butt,
            LineCap::Round => kurbo::Cap::Round,
            LineCap::Square => kurbo::Cap::Square,
        };
        let join = match self.join {
            LineJoin::Round => kurbo::Join::Round,
            LineJoin::Bevel => kurbo::Join::Bevel,
            LineJoin::Miter => kurbo::Join::Miter,
        };
        let stroke = kurbo::Stroke::new(self.width)
            .with_caps(cap)
            .with_join(join)
            .with_miter_limit(self.miter_limit);
        if self.dash.is_empty() {
            stroke
        } else {
            stroke.with_dashes(self.dash_offset, self.dash.iter().copied())
        }
    }
}

#[derive(Clone)]
struct DrawState {
    transform: Affine,
    fill: Brush,
    stroke: Brush,
    line: LineStyle,
    alpha: f32,
    // `None` is plain source-over.
    blend: Option<BlendMode>,
    shadow: Shadow,
    font: String,
    align: TextAlign,
    baseline: TextBaseline,
    // Device-space clip paths, intersected in order.
    clips: Vec<(vello_cpu::kurbo::BezPath, Fill)>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: Brush::black(),
            stroke: Brush::black(),
            line: LineStyle::default(),
            alpha: 1.0,
            blend: None,
            shadow: Shadow::none(),
            font: "10px sans-serif".to_owned(),
            align: TextAlign::default(),
            baseline: TextBaseline::default(),
            clips: Vec::new(),
        }
    }
}

struct GlyphSet {
    font: vello_cpu::peniko::FontData,
    size: f32,
    glyphs: Vec<(u32, f32, f32)>,
}

enum Geometry<'a> {
    Fill(&'a vello_cpu::kurbo::BezPath, Fill),
    Stroke(&'a vello_cpu::kurbo::BezPath, &'a vello_cpu::kurbo::Stroke),
    Rect(vello_cpu::kurbo::Rect),
    Glyphs(&'a [GlyphSet]),
}

/// Canvas 2D context rasterizing with `vello_cpu`.
pub struct CpuContext {
    width: u16,
    height: u16,
    tolerance: f64,
    pixmap: vello_cpu::Pixmap,
    rc: vello_cpu::RenderContext,
    // The render context holds drawing not yet committed to `pixmap`.
    recording: bool,
    // `pixmap` is known to be fully transparent.
    blank: bool,
    state: DrawState,
    stack: Vec<DrawState>,
    // Current path, in device space.
    path: Path2D,
    fonts: FontStore,
    font_data: HashMap<String, vello_cpu::peniko::FontData>,
    text: TextLayoutEngine,
}

impl std::fmt::Debug for CpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuContext")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("recording", &self.recording)
            .field("depth", &self.stack.len())
            .finish()
    }
}

impl CpuContext {
    fn new(width: u16, height: u16, opts: SurfaceOpts, fonts: FontStore) -> Self {
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        let blank = opts.clear_rgba[3] == 0;
        if !blank {
            clear_pixmap(&mut pixmap, premul_rgba8(opts.clear_rgba));
        }
        Self {
            width,
            height,
            tolerance: opts.tolerance,
            pixmap,
            rc: vello_cpu::RenderContext::new(width, height),
            recording: false,
            blank,
            state: DrawState::default(),
            stack: Vec::new(),
            path: Path2D::new(),
            fonts,
            font_data: HashMap::new(),
            text: TextLayoutEngine::new(),
        }
    }

    /// Committed surface contents as premultiplied RGBA8.
    pub fn premul_rgba8(&mut self) -> &[u8] {
        self.commit();
        self.pixmap.data_as_u8_slice()
    }

    fn begin(&mut self) {
        if self.recording {
            return;
        }
        self.rc.reset();
        if !self.blank {
            match pixmap_from_premul_bytes(
                self.pixmap.data_as_u8_slice(),
                u32::from(self.width),
                u32::from(self.height),
            ) {
                Ok(backdrop) => {
                    self.rc.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                    self.rc
                        .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
                    self.rc.set_blend_mode(BlendMode::default());
                    self.rc.set_paint(vello_cpu::Image {
                        image: vello_cpu::ImageSource::Pixmap(Arc::new(backdrop)),
                        sampler: vello_cpu::peniko::ImageSampler::default(),
                    });
                    self.rc.fill_rect(&vello_cpu::kurbo::Rect::new(
                        0.0,
                        0.0,
                        f64::from(self.width),
                        f64::from(self.height),
                    ));
                }
                Err(e) => tracing::warn!(error = %e, "failed to rebuild backdrop"),
            }
        }
        self.recording = true;
    }

    fn commit(&mut self) {
        if !self.recording {
            return;
        }
        self.rc.flush();
        self.rc.render_to_pixmap(&mut self.pixmap);
        self.rc.reset();
        self.recording = false;
        self.blank = false;
    }

    // Draw `geometry` under `transform` with every state-level effect applied: clip, composite,
    // global alpha and shadow.
    fn paint(&mut self, transform: Affine, brush: &Brush, geometry: Geometry<'_>) {
        if self.state.alpha <= 0.0 {
            return;
        }
        let blurred = if self.state.shadow.active() && self.state.shadow.blur > 0.0 {
            self.blurred_shadow(transform, &geometry)
        } else {
            None
        };
        self.begin();
        let rc = &mut self.rc;
        rc.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        rc.set_blend_mode(BlendMode::default());
        let mut layers = 0usize;
        for (clip, rule) in &self.state.clips {
            rc.set_fill_rule(*rule);
            rc.push_clip_layer(clip);
            layers += 1;
        }
        if let Some(blend) = self.state.blend {
            rc.push_blend_layer(blend);
            layers += 1;
        }
        if self.state.alpha < 1.0 {
            rc.push_opacity_layer(self.state.alpha);
            layers += 1;
        }
        if let Some(shadow) = blurred {
            rc.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            rc.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            rc.set_fill_rule(Fill::NonZero);
            rc.set_paint(shadow);
            rc.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(self.width),
                f64::from(self.height),
            ));
        } else if self.state.shadow.active() {
            let shifted = Affine::translate(self.state.shadow.offset) * transform;
            emit(rc, shifted, &self.state.shadow.brush(), &geometry);
        }
        emit(rc, transform, brush, &geometry);
        for _ in 0..layers {
            rc.pop_layer();
        }
    }

    // Rasterize the shadow silhouette on its own, blur it, and hand it back as a full-surface
    // image to composite under the shape.
    fn blurred_shadow(
        &self,
        transform: Affine,
        geometry: &Geometry<'_>,
    ) -> Option<vello_cpu::Image> {
        let shadow = self.state.shadow;
        let sigma = shadow_sigma(shadow.blur);
        let (w, h) = (u32::from(self.width), u32::from(self.height));

        let mut scratch = vello_cpu::RenderContext::new(self.width, self.height);
        let shifted = Affine::translate(shadow.offset) * transform;
        emit(&mut scratch, shifted, &shadow.brush(), geometry);
        scratch.flush();
        let mut silhouette = vello_cpu::Pixmap::new(self.width, self.height);
        scratch.render_to_pixmap(&mut silhouette);

        let blurred = blur_rgba8_premul(
            silhouette.data_as_u8_slice(),
            w,
            h,
            kernel_radius(sigma),
            sigma as f32,
        )
        .and_then(|bytes| pixmap_from_premul_bytes(&bytes, w, h));
        match blurred {
            Ok(pixmap) => Some(vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            }),
            Err(e) => {
                tracing::debug!(error = %e, blur = shadow.blur, "shadow blur failed");
                None
            }
        }
    }

    fn fill_user_path(&mut self, path: &Path2D, transform: Affine, fill_rule: FillRule) {
        if path.is_empty() {
            return;
        }
        let cpu = bezpath_to_cpu(&path.closed_for_fill());
        let brush = self.state.fill.clone();
        self.paint(transform, &brush, Geometry::Fill(&cpu, fill_to_cpu(fill_rule)));
    }

    fn stroke_user_path(&mut self, path: &Path2D, transform: Affine) {
        if path.is_empty() {
            return;
        }
        let cpu = bezpath_to_cpu(path.as_bezpath());
        let stroke = stroke_to_cpu(&self.state.line.to_kurbo());
        let brush = self.state.stroke.clone();
        self.paint(transform, &brush, Geometry::Stroke(&cpu, &stroke));
    }

    fn push_clip(&mut self, device_path: &Path2D, fill_rule: FillRule) {
        let cpu = bezpath_to_cpu(&device_path.closed_for_fill());
        self.state.clips.push((cpu, fill_to_cpu(fill_rule)));
    }

    // The current path expressed in user space, or `None` when the transform is singular.
    fn current_path_in_user_space(&self) -> Option<Path2D> {
        let inverse = invert(self.state.transform)?;
        Some(self.path.transformed(inverse))
    }

    // Run a path-building step in user space and splice the result onto the device-space path.
    fn build_in_user_space(&mut self, f: impl FnOnce(&mut Path2D)) {
        let t = self.state.transform;
        let Some(inverse) = invert(t) else {
            return;
        };
        let mut scratch = Path2D::new();
        let seeded = match self.path.current_point() {
            Some(p) => {
                let user = inverse * p;
                scratch.move_to(user.x, user.y);
                1
            }
            None => 0,
        };
        f(&mut scratch);
        self.path.extend_mapped(&scratch, t, seeded);
    }

    fn map_point(&self, x: f64, y: f64) -> Option<Point> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        Some(self.state.transform * Point::new(x, y))
    }

    fn brush_from_paint(&mut self, paint: Paint) -> Option<Brush> {
        match paint {
            Paint::Color(c) => {
                let [r, g, b, a] = parse_css_color(&c)?;
                Some(Brush::Solid(vello_cpu::peniko::Color::from_rgba8(
                    r, g, b, a,
                )))
            }
            Paint::Gradient(g) => gradient_brush(&g),
            Paint::Pattern(p) => pattern_brush(&p),
        }
    }

    fn font_data_for(&mut self, family: &str, bytes: &[u8]) -> vello_cpu::peniko::FontData {
        let key = family.trim().to_ascii_lowercase();
        self.font_data
            .entry(key)
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(bytes.to_vec()),
                    0,
                )
            })
            .clone()
    }

    fn shape_text(&mut self, text: &str) -> Option<(Vec<GlyphSet>, f32, f32, f32)> {
        let Some(spec) = parse_font(&self.state.font) else {
            tracing::debug!(font = self.state.font.as_str(), "unusable font shorthand");
            return None;
        };
        let Some((family, bytes)) = spec
            .families
            .iter()
            .find_map(|f| self.fonts.get(f).map(|b| (f.clone(), b)))
        else {
            tracing::debug!(families = ?spec.families, "no registered font for text");
            return None;
        };
        let layout = match self
            .text
            .layout_line(text, &family, &bytes, spec.size_px)
        {
            Ok(layout) => layout,
            Err(e) => {
                tracing::debug!(error = %e, "text layout failed");
                return None;
            }
        };
        let font = self.font_data_for(&family, &bytes);

        let mut runs = Vec::new();
        let mut metrics = None;
        for line in layout.lines() {
            if metrics.is_none() {
                let m = line.metrics();
                metrics = Some((m.baseline, m.ascent, m.descent));
            }
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                runs.push(GlyphSet {
                    font: font.clone(),
                    size: run.run().font_size(),
                    glyphs: run.positioned_glyphs().map(|g| (g.id, g.x, g.y)).collect(),
                });
            }
        }
        let (baseline, ascent, descent) = metrics?;
        Some((runs, layout.width(), baseline, baseline_offset(self.state.baseline, ascent, descent)))
    }
}

impl Context2d for CpuContext {
    fn width(&self) -> u32 {
        u32::from(self.width)
    }

    fn height(&self) -> u32 {
        u32::from(self.height)
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, x: f64, y: f64) {
        if x.is_finite() && y.is_finite() {
            self.state.transform *= Affine::translate((x, y));
        }
    }

    fn rotate(&mut self, angle: f64) {
        if angle.is_finite() {
            self.state.transform *= Affine::rotate(angle);
        }
    }

    fn scale(&mut self, x: f64, y: f64) {
        if x.is_finite() && y.is_finite() {
            self.state.transform *= Affine::scale_non_uniform(x, y);
        }
    }

    fn transform(&mut self, m: Affine) {
        if m.is_finite() {
            self.state.transform *= m;
        }
    }

    fn set_transform(&mut self, m: Affine) {
        if m.is_finite() {
            self.state.transform = m;
        }
    }

    fn reset_transform(&mut self) {
        self.state.transform = Affine::IDENTITY;
    }

    fn clear(&mut self) {
        self.rc.reset();
        self.recording = false;
        clear_pixmap_to_transparent(&mut self.pixmap);
        self.blank = true;
        self.path = Path2D::new();
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let mut rect = Path2D::new();
        rect.rect(x, y, width, height);
        if rect.is_empty() || width == 0.0 || height == 0.0 {
            return;
        }
        let cpu = bezpath_to_cpu(&rect.closed_for_fill());
        self.begin();
        let rc = &mut self.rc;
        rc.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        rc.set_blend_mode(BlendMode::default());
        let mut layers = 1usize;
        for (clip, rule) in &self.state.clips {
            rc.set_fill_rule(*rule);
            rc.push_clip_layer(clip);
            layers += 1;
        }
        rc.push_blend_layer(BlendMode::new(Mix::Normal, Compose::DestOut));
        emit(
            rc,
            self.state.transform,
            &Brush::black(),
            &Geometry::Fill(&cpu, Fill::NonZero),
        );
        for _ in 0..layers {
            rc.pop_layer();
        }
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let mut rect = Path2D::new();
        rect.rect(x, y, width, height);
        self.fill_user_path(&rect, self.state.transform, FillRule::NonZero);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let mut rect = Path2D::new();
        rect.rect(x, y, width, height);
        self.stroke_user_path(&rect, self.state.transform);
    }

    fn begin_path(&mut self) {
        self.path = Path2D::new();
    }

    fn close_path(&mut self) {
        self.path.close_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        if let Some(p) = self.map_point(x, y) {
            self.path.move_to(p.x, p.y);
        }
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if let Some(p) = self.map_point(x, y) {
            self.path.line_to(p.x, p.y);
        }
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, ccw: bool) {
        self.build_in_user_space(|p| p.arc(x, y, radius, start, end, ccw));
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) {
        self.build_in_user_space(|p| p.arc_to(x1, y1, x2, y2, radius));
    }

    fn ellipse(
        &mut self,
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        start: f64,
        end: f64,
        ccw: bool,
    ) {
        self.build_in_user_space(|p| {
            p.ellipse(x, y, radius_x, radius_y, rotation, start, end, ccw)
        });
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        let (Some(cp), Some(p)) = (self.map_point(cpx, cpy), self.map_point(x, y)) else {
            return;
        };
        self.path.quadratic_curve_to(cp.x, cp.y, p.x, p.y);
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        let (Some(c1), Some(c2), Some(p)) = (
            self.map_point(cp1x, cp1y),
            self.map_point(cp2x, cp2y),
            self.map_point(x, y),
        ) else {
            return;
        };
        self.path.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y);
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.build_in_user_space(|p| p.rect(x, y, width, height));
    }

    fn round_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radii: [f64; 4]) {
        self.build_in_user_space(|p| p.round_rect(x, y, width, height, radii));
    }

    fn fill(&mut self, fill_rule: FillRule) {
        let Some(user) = self.current_path_in_user_space() else {
            return;
        };
        self.fill_user_path(&user, self.state.transform, fill_rule);
    }

    fn stroke(&mut self) {
        let Some(user) = self.current_path_in_user_space() else {
            return;
        };
        self.stroke_user_path(&user, self.state.transform);
    }

    fn clip(&mut self, fill_rule: FillRule) {
        let device = self.path.clone();
        self.push_clip(&device, fill_rule);
    }

    fn fill_path(&mut self, path: &Path2D, fill_rule: FillRule) {
        self.fill_user_path(path, self.state.transform, fill_rule);
    }

    fn stroke_path(&mut self, path: &Path2D) {
        self.stroke_user_path(path, self.state.transform);
    }

    fn clip_path(&mut self, path: &Path2D, fill_rule: FillRule) {
        let device = path.transformed(self.state.transform);
        self.push_clip(&device, fill_rule);
    }

    fn set_fill_style(&mut self, paint: Paint) {
        match self.brush_from_paint(paint) {
            Some(brush) => self.state.fill = brush,
            None => tracing::debug!("ignoring invalid fill style"),
        }
    }

    fn set_stroke_style(&mut self, paint: Paint) {
        match self.brush_from_paint(paint) {
            Some(brush) => self.state.stroke = brush,
            None => tracing::debug!("ignoring invalid stroke style"),
        }
    }

    fn set_shadow_color(&mut self, color: &str) {
        if let Some(rgba) = parse_css_color(color) {
            self.state.shadow.color = rgba;
        }
    }

    fn set_shadow_blur(&mut self, blur: f64) {
        if blur.is_finite() && blur >= 0.0 {
            self.state.shadow.blur = blur;
        }
    }

    fn set_shadow_offset_x(&mut self, offset: f64) {
        if offset.is_finite() {
            self.state.shadow.offset.x = offset;
        }
    }

    fn set_shadow_offset_y(&mut self, offset: f64) {
        if offset.is_finite() {
            self.state.shadow.offset.y = offset;
        }
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        if (0.0..=1.0).contains(&alpha) {
            self.state.alpha = alpha as f32;
        }
    }

    fn set_global_composite_operation(&mut self, operation: &str) {
        match composite_to_blend(operation) {
            Some(blend) => self.state.blend = blend,
            None => tracing::debug!(operation, "ignoring unknown composite operation"),
        }
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.state.align = align;
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.state.baseline = baseline;
    }

    fn set_font(&mut self, font: &str) {
        if parse_font(font).is_some() {
            self.state.font = font.to_owned();
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        if text.is_empty() || !x.is_finite() || !y.is_finite() {
            return;
        }
        let Some((runs, width, baseline, anchor)) = self.shape_text(text) else {
            return;
        };
        let dx = x + f64::from(align_offset(self.state.align, width));
        let dy = y - f64::from(baseline) - f64::from(anchor);
        let transform = self.state.transform * Affine::translate((dx, dy));
        let brush = self.state.fill.clone();
        self.paint(transform, &brush, Geometry::Glyphs(&runs));
    }

    fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.state.line.width = width;
        }
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.state.line.cap = cap;
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.state.line.join = join;
    }

    fn set_miter_limit(&mut self, limit: f64) {
        if limit.is_finite() && limit > 0.0 {
            self.state.line.miter_limit = limit;
        }
    }

    fn set_line_dash(&mut self, segments: &[f64]) {
        if segments.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return;
        }
        let mut dash = segments.to_vec();
        if dash.len() % 2 == 1 {
            dash.extend_from_slice(segments);
        }
        if dash.iter().all(|s| *s == 0.0) {
            dash.clear();
        }
        self.state.line.dash = dash;
    }

    fn set_line_dash_offset(&mut self, offset: f64) {
        if offset.is_finite() {
            self.state.line.dash_offset = offset;
        }
    }

    fn draw_image(&mut self, image: &RasterImage, dx: f64, dy: f64, size: Option<(f64, f64)>) {
        if image.width == 0 || image.height == 0 {
            return;
        }
        let (iw, ih) = (f64::from(image.width), f64::from(image.height));
        let (dw, dh) = size.unwrap_or((iw, ih));
        if ![dx, dy, dw, dh].iter().all(|v| v.is_finite()) || dw == 0.0 || dh == 0.0 {
            return;
        }
        let paint = match raster_to_image(image, Extend::Pad, Extend::Pad) {
            Ok(paint) => paint,
            Err(e) => {
                tracing::debug!(error = %e, "drawImage: unusable image");
                return;
            }
        };
        let placement = self.state.transform
            * Affine::translate((dx, dy))
            * Affine::scale_non_uniform(dw / iw, dh / ih);
        let brush = Brush::Image { paint, band: None };
        self.paint(
            placement,
            &brush,
            Geometry::Rect(vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih)),
        );
    }

    fn is_point_in_path(&self, path: &Path2D, x: f64, y: f64, fill_rule: FillRule) -> bool {
        let Some(inverse) = invert(self.state.transform) else {
            return false;
        };
        if !(x.is_finite() && y.is_finite()) {
            return false;
        }
        path.contains(inverse * Point::new(x, y), fill_rule)
    }

    fn is_point_in_stroke(&self, path: &Path2D, x: f64, y: f64) -> bool {
        let Some(inverse) = invert(self.state.transform) else {
            return false;
        };
        if !(x.is_finite() && y.is_finite()) {
            return false;
        }
        path.stroke_contains(
            inverse * Point::new(x, y),
            &self.state.line.to_kurbo(),
            self.tolerance,
        )
    }

    fn get_image_data(&mut self, x: i32, y: i32, width: u32, height: u32) -> ImageData {
        let Some(mut out) = ImageData::try_new(width, height) else {
            tracing::debug!(width, height, "getImageData too large; skipped");
            return ImageData::new(0, 0);
        };
        self.commit();
        let (sw, sh) = (i64::from(self.width), i64::from(self.height));
        let src = self.pixmap.data_as_u8_slice();
        for row in 0..i64::from(height) {
            let sy = i64::from(y) + row;
            if sy < 0 || sy >= sh {
                continue;
            }
            for col in 0..i64::from(width) {
                let sx = i64::from(x) + col;
                if sx < 0 || sx >= sw {
                    continue;
                }
                let si = ((sy * sw + sx) * 4) as usize;
                let di = ((row * i64::from(width) + col) * 4) as usize;
                out.data[di..di + 4].copy_from_slice(&src[si..si + 4]);
            }
        }
        unpremultiply_rgba8_in_place(&mut out.data);
        out
    }

    fn put_image_data(&mut self, image: &ImageData, dx: i32, dy: i32, dirty: Option<DirtyRect>) {
        let full = DirtyRect {
            x: 0,
            y: 0,
            width: i32::try_from(image.width).unwrap_or(i32::MAX),
            height: i32::try_from(image.height).unwrap_or(i32::MAX),
        };
        let Some((x0, y0, x1, y1)) = dirty.unwrap_or(full).clip_to(image.width, image.height)
        else {
            return;
        };
        self.commit();
        let (sw, sh) = (i64::from(self.width), i64::from(self.height));
        let dst = self.pixmap.data_as_u8_slice_mut();
        let mut wrote = false;
        for sy in y0..y1 {
            let ty = i64::from(dy) + i64::from(sy);
            if ty < 0 || ty >= sh {
                continue;
            }
            for sx in x0..x1 {
                let tx = i64::from(dx) + i64::from(sx);
                if tx < 0 || tx >= sw {
                    continue;
                }
                let si = ((sy as usize) * (image.width as usize) + (sx as usize)) * 4;
                let Some(px) = image.data.get(si..si + 4) else {
                    continue;
                };
                let mut premul = [px[0], px[1], px[2], px[3]];
                premultiply_rgba8_in_place(&mut premul);
                let di = ((ty * sw + tx) * 4) as usize;
                dst[di..di + 4].copy_from_slice(&premul);
                wrote = true;
            }
        }
        if wrote {
            self.blank = false;
        }
    }
}

fn emit(
    rc: &mut vello_cpu::RenderContext,
    transform: Affine,
    brush: &Brush,
    geometry: &Geometry<'_>,
) {
    use vello_cpu::kurbo::Shape as _;

    rc.set_transform(affine_to_cpu(transform));
    rc.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    let banded = match brush {
        Brush::Image {
            band: Some(band), ..
        } => {
            rc.set_fill_rule(Fill::NonZero);
            rc.push_clip_layer(&band.to_path(CURVE_TOLERANCE));
            true
        }
        _ => false,
    };
    match brush {
        Brush::Solid(c) => rc.set_paint(*c),
        Brush::Gradient(g) => rc.set_paint(g.clone()),
        Brush::Image { paint, .. } => rc.set_paint(paint.clone()),
    }
    match geometry {
        Geometry::Fill(path, rule) => {
            rc.set_fill_rule(*rule);
            rc.fill_path(path);
        }
        Geometry::Stroke(path, stroke) => {
            rc.set_stroke((*stroke).clone());
            rc.stroke_path(path);
        }
        Geometry::Rect(rect) => {
            rc.set_fill_rule(Fill::NonZero);
            rc.fill_rect(rect);
        }
        Geometry::Glyphs(runs) => {
            for run in runs.iter() {
                let glyphs = run.glyphs.iter().map(|&(id, x, y)| vello_cpu::Glyph { id, x, y });
                rc.glyph_run(&run.font)
                    .font_size(run.size)
                    .fill_glyphs(glyphs);
            }
        }
    }
    if banded {
        rc.pop_layer();
    }
}

fn gradient_brush(g: &CanvasGradient) -> Option<Brush> {
    let mut stops: Vec<(f32, vello_cpu::peniko::Color)> = Vec::with_capacity(g.stops.len());
    for (offset, color) in &g.stops {
        let Some([r, g, b, a]) = parse_css_color(color) else {
            tracing::debug!(color = color.as_str(), "ignoring gradient stop with invalid color");
            continue;
        };
        stops.push((*offset as f32, vello_cpu::peniko::Color::from_rgba8(r, g, b, a)));
    }
    stops.sort_by(|a, b| a.0.total_cmp(&b.0));
    match stops.as_slice() {
        [] => return Some(Brush::transparent()),
        [(_, only)] => return Some(Brush::Solid(*only)),
        _ => {}
    }
    let gradient = match g.kind {
        GradientKind::Linear { x0, y0, x1, y1 } => {
            if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
                return None;
            }
            vello_cpu::peniko::Gradient::new_linear((x0, y0), (x1, y1))
        }
        GradientKind::Radial {
            x0,
            y0,
            r0,
            x1,
            y1,
            r1,
        } => {
            if ![x0, y0, r0, x1, y1, r1].iter().all(|v| v.is_finite()) || r0 < 0.0 || r1 < 0.0 {
                return None;
            }
            vello_cpu::peniko::Gradient::new_two_point_radial(
                (x0, y0),
                r0 as f32,
                (x1, y1),
                r1 as f32,
            )
        }
        GradientKind::Conic { start_angle, x, y } => {
            if ![start_angle, x, y].iter().all(|v| v.is_finite()) {
                return None;
            }
            let start = start_angle as f32;
            vello_cpu::peniko::Gradient::new_sweep((x, y), start, start + std::f32::consts::TAU)
        }
    };
    let stops: Vec<vello_cpu::peniko::ColorStop> =
        stops.into_iter().map(vello_cpu::peniko::ColorStop::from).collect();
    Some(Brush::Gradient(gradient.with_stops(stops.as_slice())))
}

fn pattern_brush(p: &CanvasPattern) -> Option<Brush> {
    let (w, h) = (f64::from(p.image.width), f64::from(p.image.height));
    let (x_extend, y_extend, band) = match p.repetition {
        Repetition::Repeat => (Extend::Repeat, Extend::Repeat, None),
        Repetition::RepeatX => (
            Extend::Repeat,
            Extend::Pad,
            Some(vello_cpu::kurbo::Rect::new(-BAND_EXTENT, 0.0, BAND_EXTENT, h)),
        ),
        Repetition::RepeatY => (
            Extend::Pad,
            Extend::Repeat,
            Some(vello_cpu::kurbo::Rect::new(0.0, -BAND_EXTENT, w, BAND_EXTENT)),
        ),
        Repetition::NoRepeat => (
            Extend::Pad,
            Extend::Pad,
            Some(vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h)),
        ),
    };
    match raster_to_image(&p.image, x_extend, y_extend) {
        Ok(paint) => Some(Brush::Image { paint, band }),
        Err(e) => {
            tracing::debug!(error = %e, "pattern: unusable image");
            None
        }
    }
}

fn raster_to_image(
    image: &RasterImage,
    x_extend: Extend,
    y_extend: Extend,
) -> ReelResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(&image.rgba8_premul, image.width, image.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default()
            .with_x_extend(x_extend)
            .with_y_extend(y_extend),
    })
}

/// Map a canvas composite operation name to a blend mode.
///
/// `Some(None)` is plain source-over; `None` means the name is unknown.
fn composite_to_blend(op: &str) -> Option<Option<BlendMode>> {
    let compose = |c: Compose| Some(Some(BlendMode::new(Mix::Normal, c)));
    let mix = |m: Mix| Some(Some(BlendMode::new(m, Compose::SrcOver)));
    match op {
        "source-over" => Some(None),
        "source-in" => compose(Compose::SrcIn),
        "source-out" => compose(Compose::SrcOut),
        "source-atop" => compose(Compose::SrcAtop),
        "destination-over" => compose(Compose::DestOver),
        "destination-in" => compose(Compose::DestIn),
        "destination-out" => compose(Compose::DestOut),
        "destination-atop" => compose(Compose::DestAtop),
        "lighter" => compose(Compose::Plus),
        "copy" => compose(Compose::Copy),
        "xor" => compose(Compose::Xor),
        "multiply" => mix(Mix::Multiply),
        "screen" => mix(Mix::Screen),
        "overlay" => mix(Mix::Overlay),
        "darken" => mix(Mix::Darken),
        "lighten" => mix(Mix::Lighten),
        "color-dodge" => mix(Mix::ColorDodge),
        "color-burn" => mix(Mix::ColorBurn),
        "hard-light" => mix(Mix::HardLight),
        "soft-light" => mix(Mix::SoftLight),
        "difference" => mix(Mix::Difference),
        "exclusion" => mix(Mix::Exclusion),
        "hue" => mix(Mix::Hue),
        "saturation" => mix(Mix::Saturation),
        "color" => mix(Mix::Color),
        "luminosity" => mix(Mix::Luminosity),
        _ => None,
    }
}

fn fill_to_cpu(rule: FillRule) -> Fill {
    match rule {
        FillRule::NonZero => Fill::NonZero,
        FillRule::EvenOdd => Fill::EvenOdd,
    }
}

fn invert(t: Affine) -> Option<Affine> {
    let det = t.determinant();
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    Some(t.inverse())
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn premul_rgba8(rgba: [u8; 4]) -> [u8; 4] {
    let mut px = rgba;
    premultiply_rgba8_in_place(&mut px);
    px
}

fn clear_pixmap_to_transparent(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn stroke_to_cpu(s: &kurbo::Stroke) -> vello_cpu::kurbo::Stroke {
    let cap = |c: kurbo::Cap| match c {
        kurbo::Cap::Butt => vello_cpu::kurbo::Cap::Butt,
        kurbo::Cap::Round => vello_cpu::kurbo::Cap::Round,
        kurbo::Cap::Square => vello_cpu::kurbo::Cap::Square,
    };
    let join = match s.join {
        kurbo::Join::Round => vello_cpu::kurbo::Join::Round,
        kurbo::Join::Bevel => vello_cpu::kurbo::Join::Bevel,
        kurbo::Join::Miter => vello_cpu::kurbo::Join::Miter,
    };
    let out = vello_cpu::kurbo::Stroke::new(s.width)
        .with_start_cap(cap(s.start_cap))
        .with_end_cap(cap(s.end_cap))
        .with_join(join)
        .with_miter_limit(s.miter_limit);
    if s.dash_pattern.is_empty() {
        out
    } else {
        out.with_dashes(s.dash_offset, s.dash_pattern.iter().copied())
    }
}

fn bezpath_to_cpu(path: &crate::foundation::core::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(bytes: &[u8], width: u32, height: u32) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::validation("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::validation("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::validation("pixmap byte len mismatch"));
    }
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
