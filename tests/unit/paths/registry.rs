use std::cell::{Cell, RefCell};

use super::*;
use crate::protocol::batch::CommandQueue;

struct CountingHitTest {
    calls: Cell<usize>,
    answer: bool,
}

impl HitTest for CountingHitTest {
    fn is_point_in_path(&self, _path: &Path2D, _x: f64, _y: f64, _rule: FillRule) -> bool {
        self.calls.set(self.calls.get() + 1);
        self.answer
    }

    fn is_point_in_stroke(&self, _path: &Path2D, _x: f64, _y: f64) -> bool {
        self.calls.set(self.calls.get() + 1);
        self.answer
    }
}

#[test]
fn create_has_dispose_lifecycle() {
    let mut reg = PathRegistry::new();
    let id = reg.create_path(None);
    assert!(reg.has_path(id));
    assert!(reg.get_path(id).unwrap().is_empty());

    reg.dispose_path(id);
    assert!(!reg.has_path(id));
    assert!(reg.get_path(id).is_none());
    reg.dispose_path(id);
    reg.dispose_path(PathHandle(999));
}

#[test]
fn handles_are_never_reused() {
    let mut reg = PathRegistry::new();
    let a = reg.create_path(None);
    reg.dispose_path(a);
    let b = reg.create_path(None);
    assert_ne!(a, b);
    assert!(b > a);
    reg.clear();
    let c = reg.create_path(None);
    assert!(c > b);
}

#[test]
fn seeded_paths_hold_geometry() {
    let mut reg = PathRegistry::new();
    let id = reg.create_path(Some("M0,0 L4,0 L4,4 Z"));
    assert!(!reg.get_path(id).unwrap().is_empty());
    let junk = reg.create_path(Some("M0,0 L"));
    assert!(reg.has_path(junk));
}

#[test]
fn clone_is_independent_and_unknown_clone_is_none() {
    let mut reg = PathRegistry::new();
    let id = reg.create_path(None);
    reg.rect(id, 0.0, 0.0, 2.0, 2.0);
    let copy = reg.clone_path(id).unwrap();
    assert_ne!(copy, id);
    assert!(reg.has_path(copy));

    reg.line_to(id, 9.0, 9.0);
    assert_ne!(reg.get_path(id), reg.get_path(copy));

    reg.dispose_path(id);
    assert_eq!(reg.clone_path(id), None);
    assert_eq!(reg.clone_path(PathHandle(12345)), None);
}

#[test]
fn mutators_on_unknown_handles_are_no_ops() {
    let mut reg = PathRegistry::new();
    let ghost = PathHandle(42);
    reg.move_to(ghost, 1.0, 1.0);
    reg.line_to(ghost, 2.0, 2.0);
    reg.arc(ghost, 0.0, 0.0, 1.0, 0.0, 1.0, false);
    reg.close_path(ghost);
    assert!(reg.is_empty());

    let live = reg.create_path(None);
    reg.add_path(live, ghost);
    reg.add_path(ghost, live);
    assert!(reg.get_path(live).unwrap().is_empty());
}

#[test]
fn add_path_appends_source_geometry() {
    let mut reg = PathRegistry::new();
    let a = reg.create_path(None);
    let b = reg.create_path(Some("M10,10 L20,10 L20,20 Z"));
    reg.add_path(a, b);
    assert_eq!(
        reg.get_path(a).unwrap().elements(),
        reg.get_path(b).unwrap().elements()
    );
    reg.add_path(a, a);
    assert_eq!(reg.get_path(a).unwrap().elements().len(), 8);
}

#[test]
fn render_calls_emit_through_sink_only_for_live_handles() {
    let queue = CommandQueue::new();
    let mut reg = PathRegistry::new();
    reg.set_command_sink(Some(queue.sink()));

    let id = reg.create_path(None);
    reg.fill_path(id, Some(FillRule::EvenOdd));
    reg.stroke_path(id);
    reg.clip_path(id, None);
    reg.fill_path(PathHandle(77), None);
    reg.stroke_path(PathHandle(77));
    reg.clip_path(PathHandle(77), None);

    assert_eq!(
        queue.take_batch(),
        vec![
            DrawCommand::FillPath {
                id,
                fill_rule: Some(FillRule::EvenOdd)
            },
            DrawCommand::StrokePath {
                id,
                fill_rule: None
            },
            DrawCommand::ClipPath {
                id,
                fill_rule: None
            },
        ]
    );
}

#[test]
fn render_calls_without_sink_do_nothing() {
    let mut reg = PathRegistry::new();
    let id = reg.create_path(None);
    reg.fill_path(id, None);

    let seen = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&seen);
    reg.set_command_sink(Some(Box::new(move |_| *counter.borrow_mut() += 1)));
    reg.fill_path(id, None);
    reg.set_command_sink(None);
    reg.fill_path(id, None);
    assert_eq!(*seen.borrow(), 1);
}

#[test]
fn hit_tests_are_false_without_capability_or_handle() {
    let mut reg = PathRegistry::new();
    let id = reg.create_path(Some("M0,0 L10,0 L10,10 Z"));
    assert!(!reg.is_point_in_stored_path(id, 5.0, 1.0, None));
    assert!(!reg.is_point_in_stored_stroke(id, 5.0, 0.0));

    let hit = Rc::new(CountingHitTest {
        calls: Cell::new(0),
        answer: true,
    });
    reg.set_hit_tester(Some(hit.clone() as Rc<dyn HitTest>));
    assert!(!reg.is_point_in_stored_path(PathHandle(999), 5.0, 1.0, None));
    assert!(!reg.is_point_in_stored_stroke(PathHandle(999), 5.0, 1.0));
    assert_eq!(hit.calls.get(), 0);

    assert!(reg.is_point_in_stored_path(id, 5.0, 1.0, Some(FillRule::EvenOdd)));
    assert!(reg.is_point_in_stored_stroke(id, 5.0, 0.0));
    assert_eq!(hit.calls.get(), 2);

    reg.dispose_path(id);
    assert!(!reg.is_point_in_stored_path(id, 5.0, 1.0, None));
    assert_eq!(hit.calls.get(), 2);
}
