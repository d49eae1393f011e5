use super::*;

#[test]
fn fill_rule_wire_names() {
    assert_eq!(
        serde_json::to_string(&FillRule::EvenOdd).unwrap(),
        "\"evenodd\""
    );
    let r: FillRule = serde_json::from_str("\"nonzero\"").unwrap();
    assert_eq!(r, FillRule::NonZero);
}

#[test]
fn fill_rule_winding_decisions() {
    assert!(FillRule::NonZero.contains(2));
    assert!(!FillRule::EvenOdd.contains(2));
    assert!(FillRule::EvenOdd.contains(-1));
    assert!(!FillRule::NonZero.contains(0));
}

#[test]
fn dirty_rect_normalizes_and_clips() {
    let r = DirtyRect {
        x: 4,
        y: 4,
        width: -6,
        height: 2,
    };
    assert_eq!(r.clip_to(10, 10), Some((0, 4, 4, 6)));

    let outside = DirtyRect {
        x: 20,
        y: 0,
        width: 5,
        height: 5,
    };
    assert_eq!(outside.clip_to(10, 10), None);
}
