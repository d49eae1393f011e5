use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::core::FillRule;
use crate::paths::path2d::Path2D;
use crate::protocol::batch::CommandSink;
use crate::protocol::command::{DrawCommand, PathHandle};

/// Synchronous hit-testing capability, usually backed by the renderer's live context.
pub trait HitTest {
    /// `true` when `(x, y)` (device space) falls inside `path` under the current transform.
    fn is_point_in_path(&self, path: &Path2D, x: f64, y: f64, fill_rule: FillRule) -> bool;

    /// `true` when `(x, y)` (device space) falls on the stroke of `path` with the current line
    /// style.
    fn is_point_in_stroke(&self, path: &Path2D, x: f64, y: f64) -> bool;
}

/// Owns paths behind opaque integer handles.
///
/// Every method is total: unknown or disposed handles make mutators no-ops and queries return
/// `None`/`false`. Handles come from one monotonically increasing counter and are never reused,
/// so a stale handle can never alias a newer path.
///
/// Rendering a stored path does not touch the context directly; it emits a command through the
/// injected sink so it lands on the same ordered timeline as every other drawing operation.
pub struct PathRegistry {
    paths: HashMap<PathHandle, Path2D>,
    next_id: u64,
    sink: Option<CommandSink>,
    hit_tester: Option<Rc<dyn HitTest>>,
}

impl Default for PathRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PathRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathRegistry")
            .field("live", &self.paths.len())
            .field("next_id", &self.next_id)
            .field("has_sink", &self.sink.is_some())
            .field("has_hit_tester", &self.hit_tester.is_some())
            .finish()
    }
}

impl PathRegistry {
    /// Empty registry with no sink and no hit tester.
    pub fn new() -> Self {
        Self {
            paths: HashMap::new(),
            next_id: 1,
            sink: None,
            hit_tester: None,
        }
    }

    /// Install (or remove) the sink receiving `fillPath`/`strokePath`/`clipPath` commands.
    pub fn set_command_sink(&mut self, sink: Option<CommandSink>) {
        self.sink = sink;
    }

    /// Install (or remove) the capability answering hit tests.
    pub fn set_hit_tester(&mut self, hit_tester: Option<Rc<dyn HitTest>>) {
        self.hit_tester = hit_tester;
    }

    /// Allocate a path, empty or seeded from SVG path data. Always succeeds.
    pub fn create_path(&mut self, seed: Option<&str>) -> PathHandle {
        let path = seed.map(Path2D::from_svg).unwrap_or_default();
        self.insert(path)
    }

    /// Copy a live path under a fresh handle.
    pub fn clone_path(&mut self, handle: PathHandle) -> Option<PathHandle> {
        let copy = self.paths.get(&handle)?.clone();
        Some(self.insert(copy))
    }

    /// Remove a path. Disposing an unknown or already-disposed handle is a no-op.
    pub fn dispose_path(&mut self, handle: PathHandle) {
        if self.paths.remove(&handle).is_none() {
            tracing::debug!(id = handle.0, "dispose of unknown path handle");
        }
    }

    /// `true` when `handle` refers to a live path.
    pub fn has_path(&self, handle: PathHandle) -> bool {
        self.paths.contains_key(&handle)
    }

    /// Borrow the live path behind `handle`.
    pub fn get_path(&self, handle: PathHandle) -> Option<&Path2D> {
        self.paths.get(&handle)
    }

    /// Number of live paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// `true` when no path is live.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Dispose every path. The handle counter keeps counting.
    pub fn clear(&mut self) {
        self.paths.clear();
    }

    /// Start a new subpath at `(x, y)` on the path behind `handle`.
    pub fn move_to(&mut self, handle: PathHandle, x: f64, y: f64) {
        self.with_path(handle, |p| p.move_to(x, y));
    }

    /// Straight segment to `(x, y)`.
    pub fn line_to(&mut self, handle: PathHandle, x: f64, y: f64) {
        self.with_path(handle, |p| p.line_to(x, y));
    }

    /// Close the current subpath.
    pub fn close_path(&mut self, handle: PathHandle) {
        self.with_path(handle, Path2D::close_path);
    }

    /// Append a closed rectangle subpath.
    pub fn rect(&mut self, handle: PathHandle, x: f64, y: f64, width: f64, height: f64) {
        self.with_path(handle, |p| p.rect(x, y, width, height));
    }

    /// Append a closed rounded-rectangle subpath.
    ///
    /// `radii` is `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn round_rect(
        &mut self,
        handle: PathHandle,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radii: [f64; 4],
    ) {
        self.with_path(handle, |p| p.round_rect(x, y, width, height, radii));
    }

    /// Circular arc around `(x, y)`, joined to the current point by a line.
    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        &mut self,
        handle: PathHandle,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    ) {
        self.with_path(handle, |p| {
            p.arc(x, y, radius, start_angle, end_angle, counterclockwise)
        });
    }

    /// Arc tangent to the lines through the current point, `(x1, y1)` and `(x2, y2)`.
    pub fn arc_to(&mut self, handle: PathHandle, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) {
        self.with_path(handle, |p| p.arc_to(x1, y1, x2, y2, radius));
    }

    /// Elliptical arc, rotated by `rotation` radians.
    #[allow(clippy::too_many_arguments)]
    pub fn ellipse(
        &mut self,
        handle: PathHandle,
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    ) {
        self.with_path(handle, |p| {
            p.ellipse(
                x,
                y,
                radius_x,
                radius_y,
                rotation,
                start_angle,
                end_angle,
                counterclockwise,
            )
        });
    }

    /// Quadratic Bezier segment through control point `(cpx, cpy)`.
    pub fn quadratic_curve_to(&mut self, handle: PathHandle, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.with_path(handle, |p| p.quadratic_curve_to(cpx, cpy, x, y));
    }

    /// Cubic Bezier segment.
    #[allow(clippy::too_many_arguments)]
    pub fn bezier_curve_to(
        &mut self,
        handle: PathHandle,
        cp1x: f64,
        cp1y: f64,
        cp2x: f64,
        cp2y: f64,
        x: f64,
        y: f64,
    ) {
        self.with_path(handle, |p| p.bezier_curve_to(cp1x, cp1y, cp2x, cp2y, x, y));
    }

    /// Append the geometry of `source` to `target`. Either handle being unknown is a no-op.
    pub fn add_path(&mut self, target: PathHandle, source: PathHandle) {
        let Some(src) = self.paths.get(&source).cloned() else {
            return;
        };
        self.with_path(target, |p| p.add_path(&src, None));
    }

    /// Emit `fillPath` for a live handle.
    pub fn fill_path(&mut self, handle: PathHandle, fill_rule: Option<FillRule>) {
        self.emit(
            handle,
            DrawCommand::FillPath {
                id: handle,
                fill_rule,
            },
        );
    }

    /// Emit `strokePath` for a live handle.
    pub fn stroke_path(&mut self, handle: PathHandle) {
        self.emit(
            handle,
            DrawCommand::StrokePath {
                id: handle,
                fill_rule: None,
            },
        );
    }

    /// Emit `clipPath` for a live handle.
    pub fn clip_path(&mut self, handle: PathHandle, fill_rule: Option<FillRule>) {
        self.emit(
            handle,
            DrawCommand::ClipPath {
                id: handle,
                fill_rule,
            },
        );
    }

    /// Synchronous fill hit test against a stored path.
    pub fn is_point_in_stored_path(
        &self,
        handle: PathHandle,
        x: f64,
        y: f64,
        fill_rule: Option<FillRule>,
    ) -> bool {
        let (Some(path), Some(hit)) = (self.paths.get(&handle), self.hit_tester.as_ref()) else {
            return false;
        };
        hit.is_point_in_path(path, x, y, fill_rule.unwrap_or_default())
    }

    /// Synchronous stroke hit test against a stored path.
    pub fn is_point_in_stored_stroke(&self, handle: PathHandle, x: f64, y: f64) -> bool {
        let (Some(path), Some(hit)) = (self.paths.get(&handle), self.hit_tester.as_ref()) else {
            return false;
        };
        hit.is_point_in_stroke(path, x, y)
    }

    fn insert(&mut self, path: Path2D) -> PathHandle {
        let handle = PathHandle(self.next_id);
        self.next_id += 1;
        self.paths.insert(handle, path);
        handle
    }

    fn with_path(&mut self, handle: PathHandle, f: impl FnOnce(&mut Path2D)) {
        match self.paths.get_mut(&handle) {
            Some(p) => f(p),
            None => tracing::debug!(id = handle.0, "mutation of unknown path handle"),
        }
    }

    fn emit(&mut self, handle: PathHandle, cmd: DrawCommand) {
        if !self.paths.contains_key(&handle) {
            tracing::debug!(id = handle.0, "render of unknown path handle");
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink(cmd);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paths/registry.rs"]
mod tests;
