use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::*;

fn near(a: Point, b: Point) -> bool {
    (a - b).hypot() < 1e-6
}

#[test]
fn line_to_without_subpath_starts_one() {
    let mut p = Path2D::new();
    p.line_to(5.0, 5.0);
    assert_eq!(p.elements(), &[PathEl::MoveTo(Point::new(5.0, 5.0))]);
    p.line_to(6.0, 5.0);
    assert_eq!(p.current_point(), Some(Point::new(6.0, 5.0)));
}

#[test]
fn close_returns_pen_to_subpath_start_and_reopens() {
    let mut p = Path2D::new();
    p.move_to(1.0, 1.0);
    p.line_to(4.0, 1.0);
    p.close_path();
    assert_eq!(p.current_point(), Some(Point::new(1.0, 1.0)));
    p.line_to(1.0, 4.0);
    let els = p.elements();
    assert_eq!(els[3], PathEl::MoveTo(Point::new(1.0, 1.0)));
    assert_eq!(els[4], PathEl::LineTo(Point::new(1.0, 4.0)));
}

#[test]
fn rect_is_closed_and_parks_the_pen() {
    let mut p = Path2D::new();
    p.rect(0.0, 0.0, 10.0, 10.0);
    assert_eq!(p.elements().len(), 5);
    assert_eq!(p.current_point(), Some(Point::new(0.0, 0.0)));
    assert!(p.contains(Point::new(5.0, 5.0), FillRule::NonZero));
    assert!(!p.contains(Point::new(15.0, 5.0), FillRule::NonZero));
}

#[test]
fn svg_seed_and_invalid_seed() {
    let p = Path2D::from_svg("M0,0 L10,0 L10,10 Z");
    assert!(!p.is_empty());
    assert_eq!(p.current_point(), Some(Point::new(0.0, 0.0)));

    let bad = Path2D::from_svg("this is not path data");
    assert!(bad.is_empty());
    assert_eq!(bad.current_point(), None);
}

#[test]
fn arc_connects_with_a_line_and_ends_on_the_circle() {
    let mut p = Path2D::new();
    p.move_to(0.0, 0.0);
    p.arc(10.0, 10.0, 5.0, 0.0, FRAC_PI_2, false);
    assert_eq!(p.elements()[1], PathEl::LineTo(Point::new(15.0, 10.0)));
    assert!(near(p.current_point().unwrap(), Point::new(10.0, 15.0)));
}

#[test]
fn full_circle_contains_center_but_not_outside() {
    let mut p = Path2D::new();
    p.arc(0.0, 0.0, 10.0, 0.0, TAU, false);
    assert!(p.contains(Point::new(0.0, 0.0), FillRule::NonZero));
    assert!(p.contains(Point::new(9.0, 0.0), FillRule::NonZero));
    assert!(!p.contains(Point::new(11.0, 0.0), FillRule::NonZero));
}

#[test]
fn counterclockwise_arc_goes_the_long_way() {
    let mut p = Path2D::new();
    p.arc(0.0, 0.0, 10.0, 0.0, FRAC_PI_2, true);
    // Three quarters of the circle are drawn, passing through (-10, 0).
    assert!(p.contains(Point::new(-5.0, 0.0), FillRule::NonZero));
    assert!(near(p.current_point().unwrap(), Point::new(0.0, 10.0)));
}

#[test]
fn negative_radius_is_ignored() {
    let mut p = Path2D::new();
    p.arc(0.0, 0.0, -1.0, 0.0, PI, false);
    assert!(p.is_empty());
}

#[test]
fn arc_to_rounds_a_corner() {
    let mut p = Path2D::new();
    p.move_to(0.0, 0.0);
    p.arc_to(10.0, 0.0, 10.0, 10.0, 2.0);
    // Tangent points are (8, 0) and (10, 2).
    let PathEl::LineTo(t1) = p.elements()[1] else {
        panic!("expected a line to the first tangent point");
    };
    assert!(near(t1, Point::new(8.0, 0.0)));
    assert!(near(p.current_point().unwrap(), Point::new(10.0, 2.0)));
}

#[test]
fn degenerate_arc_to_is_a_line() {
    let mut p = Path2D::new();
    p.move_to(0.0, 0.0);
    p.arc_to(5.0, 0.0, 10.0, 0.0, 3.0);
    assert_eq!(p.elements()[1], PathEl::LineTo(Point::new(5.0, 0.0)));

    let mut empty = Path2D::new();
    empty.arc_to(1.0, 1.0, 2.0, 2.0, 1.0);
    assert_eq!(empty.elements(), &[PathEl::MoveTo(Point::new(1.0, 1.0))]);
}

#[test]
fn round_rect_scales_oversized_radii() {
    let mut p = Path2D::new();
    p.round_rect(0.0, 0.0, 10.0, 10.0, [20.0; 4]);
    assert!(p.contains(Point::new(5.0, 5.0), FillRule::NonZero));
    // With radii scaled to 5 the shape is a circle; the corner is outside.
    assert!(!p.contains(Point::new(0.5, 0.5), FillRule::NonZero));
    assert_eq!(p.current_point(), Some(Point::new(0.0, 0.0)));
}

#[test]
fn even_odd_leaves_a_hole() {
    let mut p = Path2D::new();
    p.rect(0.0, 0.0, 10.0, 10.0);
    p.rect(2.0, 2.0, 6.0, 6.0);
    assert!(p.contains(Point::new(5.0, 5.0), FillRule::NonZero));
    assert!(!p.contains(Point::new(5.0, 5.0), FillRule::EvenOdd));
    assert!(p.contains(Point::new(1.0, 5.0), FillRule::EvenOdd));
}

#[test]
fn open_subpaths_are_closed_for_filling() {
    let mut p = Path2D::new();
    p.move_to(0.0, 0.0);
    p.line_to(10.0, 0.0);
    p.line_to(10.0, 10.0);
    assert!(p.contains(Point::new(8.0, 2.0), FillRule::NonZero));
}

#[test]
fn stroke_hit_test_respects_line_width() {
    let mut p = Path2D::new();
    p.move_to(0.0, 0.0);
    p.line_to(10.0, 0.0);
    let thin = kurbo::Stroke::new(1.0);
    let wide = kurbo::Stroke::new(6.0);
    assert!(p.stroke_contains(Point::new(5.0, 0.2), &thin, CURVE_TOLERANCE));
    assert!(!p.stroke_contains(Point::new(5.0, 2.0), &thin, CURVE_TOLERANCE));
    assert!(p.stroke_contains(Point::new(5.0, 2.0), &wide, CURVE_TOLERANCE));
    assert!(!Path2D::new().stroke_contains(Point::ORIGIN, &wide, CURVE_TOLERANCE));
}

#[test]
fn add_path_and_transformed_copy() {
    let mut a = Path2D::new();
    a.rect(0.0, 0.0, 1.0, 1.0);
    let b = a.transformed(Affine::translate((10.0, 0.0)));
    a.add_path(&b, None);
    assert!(a.contains(Point::new(10.5, 0.5), FillRule::NonZero));
    assert!(a.contains(Point::new(0.5, 0.5), FillRule::NonZero));
}

#[test]
fn non_finite_input_is_ignored() {
    let mut p = Path2D::new();
    p.move_to(f64::NAN, 0.0);
    p.line_to(0.0, f64::INFINITY);
    p.rect(0.0, 0.0, f64::NAN, 1.0);
    assert!(p.is_empty());
}
