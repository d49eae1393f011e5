//! Vector path with HTML canvas path-building semantics.
//!
//! Geometry is stored as a [`kurbo::BezPath`]; the wrapper tracks the pen position and the start
//! of the current subpath so arcs, `arcTo` and implicit subpath creation behave like the canvas.

use kurbo::{Arc, PathEl, RoundedRect, RoundedRectRadii, Shape, StrokeOpts};

use crate::foundation::core::{Affine, BezPath, FillRule, Point, Rect, Vec2};
use crate::foundation::math::canvas_arc_sweep;

/// Flattening tolerance used when approximating arcs with cubic curves.
pub(crate) const CURVE_TOLERANCE: f64 = 0.1;

const POINT_EPSILON: f64 = 1e-9;

/// A path under construction or stored in the registry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path2D {
    path: BezPath,
    start: Option<Point>,
    current: Option<Point>,
    // After `closePath` the next segment needs an explicit `MoveTo` at the subpath start.
    reopen: bool,
}

impl Path2D {
    /// Empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a path from SVG path data.
    ///
    /// Unparsable data yields an empty path.
    pub fn from_svg(d: &str) -> Self {
        match BezPath::from_svg(d.trim()) {
            Ok(bp) => Self::from_bezpath(bp),
            Err(e) => {
                tracing::warn!(error = %e, "invalid path seed; starting empty");
                Self::new()
            }
        }
    }

    /// Wrap an existing [`BezPath`], recovering the pen position from its elements.
    pub fn from_bezpath(path: BezPath) -> Self {
        let mut out = Self::new();
        for &el in path.elements() {
            out.push_el(el);
        }
        out
    }

    /// Underlying geometry.
    pub fn as_bezpath(&self) -> &BezPath {
        &self.path
    }

    /// Path elements in order.
    pub fn elements(&self) -> &[PathEl] {
        self.path.elements()
    }

    /// `true` when no element has been added.
    pub fn is_empty(&self) -> bool {
        self.path.elements().is_empty()
    }

    /// Current pen position, if a subpath exists.
    pub fn current_point(&self) -> Option<Point> {
        self.current
    }

    /// Start a new subpath at `(x, y)`.
    pub fn move_to(&mut self, x: f64, y: f64) {
        if !finite(&[x, y]) {
            return;
        }
        self.push_el(PathEl::MoveTo(Point::new(x, y)));
    }

    /// Straight segment to `(x, y)`; starts a subpath there if none exists.
    pub fn line_to(&mut self, x: f64, y: f64) {
        if !finite(&[x, y]) {
            return;
        }
        let p = Point::new(x, y);
        if self.ensure_subpath(p) {
            return;
        }
        self.push_el(PathEl::LineTo(p));
    }

    /// Close the current subpath back to its start.
    pub fn close_path(&mut self) {
        if self.current.is_none() || self.reopen {
            return;
        }
        self.push_el(PathEl::ClosePath);
    }

    /// Quadratic Bézier to `(x, y)` through control `(cpx, cpy)`.
    pub fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        if !finite(&[cpx, cpy, x, y]) {
            return;
        }
        let cp = Point::new(cpx, cpy);
        self.ensure_subpath(cp);
        self.push_el(PathEl::QuadTo(cp, Point::new(x, y)));
    }

    /// Cubic Bézier to `(x, y)` through two control points.
    pub fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        if !finite(&[cp1x, cp1y, cp2x, cp2y, x, y]) {
            return;
        }
        let cp1 = Point::new(cp1x, cp1y);
        self.ensure_subpath(cp1);
        self.push_el(PathEl::CurveTo(cp1, Point::new(cp2x, cp2y), Point::new(x, y)));
    }

    /// Closed rectangle subpath; the pen ends at `(x, y)`.
    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if !finite(&[x, y, width, height]) {
            return;
        }
        self.push_el(PathEl::MoveTo(Point::new(x, y)));
        self.push_el(PathEl::LineTo(Point::new(x + width, y)));
        self.push_el(PathEl::LineTo(Point::new(x + width, y + height)));
        self.push_el(PathEl::LineTo(Point::new(x, y + height)));
        self.push_el(PathEl::ClosePath);
        self.park_at(Point::new(x, y));
    }

    /// Closed rounded-rectangle subpath.
    ///
    /// `radii` is `[top_left, top_right, bottom_right, bottom_left]`; radii that do not fit are
    /// scaled down uniformly. The pen ends at `(x, y)`.
    pub fn round_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radii: [f64; 4]) {
        if !finite(&[x, y, width, height]) || !finite(&radii) {
            return;
        }
        let rect = Rect::new(x, y, x + width, y + height).abs();
        let [tl, tr, br, bl] = radii.map(|r| r.max(0.0));
        let (w, h) = (rect.width(), rect.height());
        let mut scale = 1.0f64;
        for (side, sum) in [(w, tl + tr), (w, bl + br), (h, tl + bl), (h, tr + br)] {
            if sum > side && sum > 0.0 {
                scale = scale.min(side / sum);
            }
        }
        let rr = RoundedRect::from_rect(
            rect,
            RoundedRectRadii::new(tl * scale, tr * scale, br * scale, bl * scale),
        );
        for el in rr.path_elements(CURVE_TOLERANCE) {
            self.push_el(el);
        }
        self.park_at(Point::new(x, y));
    }

    /// Circular arc; see [`Path2D::ellipse`].
    pub fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    ) {
        self.ellipse(
            x,
            y,
            radius,
            radius,
            0.0,
            start_angle,
            end_angle,
            counterclockwise,
        );
    }

    /// Elliptical arc, connected to the previous pen position by a straight line.
    ///
    /// Negative radii and non-finite arguments leave the path unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn ellipse(
        &mut self,
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    ) {
        if !finite(&[x, y, radius_x, radius_y, rotation, start_angle, end_angle]) {
            return;
        }
        if radius_x < 0.0 || radius_y < 0.0 {
            return;
        }
        let center = Point::new(x, y);
        let radii = Vec2::new(radius_x, radius_y);
        let sweep = canvas_arc_sweep(start_angle, end_angle, counterclockwise);
        let first = point_on_ellipse(center, radii, rotation, start_angle);
        if self.current.is_some() {
            self.push_el(PathEl::LineTo(first));
        } else {
            self.push_el(PathEl::MoveTo(first));
        }
        let arc = Arc {
            center,
            radii,
            start_angle,
            sweep_angle: sweep,
            x_rotation: rotation,
        };
        for el in arc.append_iter(CURVE_TOLERANCE) {
            self.push_el(el);
        }
        self.current = Some(point_on_ellipse(
            center,
            radii,
            rotation,
            start_angle + sweep,
        ));
    }

    /// Arc tangent to the lines `pen → (x1, y1)` and `(x1, y1) → (x2, y2)`.
    ///
    /// Degenerate configurations (coincident or collinear points, zero radius) add a straight
    /// line to `(x1, y1)`.
    pub fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) {
        if !finite(&[x1, y1, x2, y2, radius]) || radius < 0.0 {
            return;
        }
        let p1 = Point::new(x1, y1);
        let p2 = Point::new(x2, y2);
        let Some(p0) = self.current else {
            self.move_to(x1, y1);
            return;
        };
        let v1 = p0 - p1;
        let v2 = p2 - p1;
        let (l1, l2) = (v1.hypot(), v2.hypot());
        if l1 < POINT_EPSILON || l2 < POINT_EPSILON || radius == 0.0 {
            self.line_to(x1, y1);
            return;
        }
        let (u1, u2) = (v1 / l1, v2 / l2);
        let cross = u1.cross(u2);
        if cross.abs() < POINT_EPSILON {
            self.line_to(x1, y1);
            return;
        }
        let half = u1.dot(u2).clamp(-1.0, 1.0).acos() / 2.0;
        let tangent_len = radius / half.tan();
        let t1 = p1 + u1 * tangent_len;
        let t2 = p1 + u2 * tangent_len;
        let center = p1 + (u1 + u2).normalize() * (radius / half.sin());
        let start = (t1 - center).atan2();
        let end = (t2 - center).atan2();
        self.arc(center.x, center.y, radius, start, end, cross > 0.0);
    }

    /// Append another path's geometry, optionally transformed.
    pub fn add_path(&mut self, other: &Path2D, transform: Option<Affine>) {
        self.extend_mapped(other, transform.unwrap_or(Affine::IDENTITY), 0);
    }

    /// Append `other` mapped through `t`, dropping its first `skip` elements.
    ///
    /// Used to splice geometry built in another coordinate space onto an open subpath.
    pub(crate) fn extend_mapped(&mut self, other: &Path2D, t: Affine, skip: usize) {
        for &el in other.path.elements().iter().skip(skip) {
            self.push_el(t * el);
        }
    }

    /// Copy of this path with every point mapped through `t`.
    pub fn transformed(&self, t: Affine) -> Path2D {
        let mut out = Path2D::new();
        out.add_path(self, Some(t));
        out
    }

    /// Geometry with every open subpath implicitly closed, as used for filling and clipping.
    pub fn closed_for_fill(&self) -> BezPath {
        let mut out = BezPath::new();
        let mut open = false;
        for &el in self.path.elements() {
            match el {
                PathEl::MoveTo(_) => {
                    if open {
                        out.close_path();
                    }
                    open = true;
                }
                PathEl::ClosePath => open = false,
                _ => {}
            }
            out.push(el);
        }
        if open {
            out.close_path();
        }
        out
    }

    /// Fill hit test in path coordinates.
    pub fn contains(&self, pt: Point, fill_rule: FillRule) -> bool {
        fill_rule.contains(self.closed_for_fill().winding(pt))
    }

    /// Stroke hit test in path coordinates, flattening the outline at `tolerance`.
    pub fn stroke_contains(&self, pt: Point, style: &kurbo::Stroke, tolerance: f64) -> bool {
        if self.is_empty() {
            return false;
        }
        let outline = kurbo::stroke(
            self.path.elements().iter().copied(),
            style,
            &StrokeOpts::default(),
            tolerance,
        );
        outline.winding(pt) != 0
    }

    // Canvas "ensure there is a subpath": returns `true` when it had to start one at `p`.
    fn ensure_subpath(&mut self, p: Point) -> bool {
        if self.current.is_none() {
            self.push_el(PathEl::MoveTo(p));
            return true;
        }
        false
    }

    fn park_at(&mut self, p: Point) {
        self.start = Some(p);
        self.current = Some(p);
        self.reopen = true;
    }

    fn push_el(&mut self, el: PathEl) {
        if self.reopen && !matches!(el, PathEl::MoveTo(_) | PathEl::ClosePath) {
            if let Some(p) = self.current {
                self.path.push(PathEl::MoveTo(p));
            }
        }
        match el {
            PathEl::MoveTo(p) => {
                self.start = Some(p);
                self.current = Some(p);
                self.reopen = false;
            }
            PathEl::LineTo(p) | PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => {
                self.current = Some(p);
                self.reopen = false;
            }
            PathEl::ClosePath => {
                self.current = self.start;
                self.reopen = true;
            }
        }
        self.path.push(el);
    }
}

fn point_on_ellipse(center: Point, radii: Vec2, rotation: f64, angle: f64) -> Point {
    let (s, c) = angle.sin_cos();
    let (rs, rc) = rotation.sin_cos();
    let (lx, ly) = (radii.x * c, radii.y * s);
    center + Vec2::new(lx * rc - ly * rs, lx * rs + ly * rc)
}

fn finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
#[path = "../../tests/unit/paths/path2d.rs"]
mod tests;
