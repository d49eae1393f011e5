use super::*;
use crate::assets::image_cache::RasterImage;
use crate::protocol::batch::decode_batch;
use crate::protocol::style::Repetition;
use crate::render::recording::{RecordingContext, RecordingSurface, init_tracing};

fn renderer() -> Renderer<RecordingContext> {
    init_tracing();
    Renderer::new(&mut RecordingSurface { available: true }, None).unwrap()
}

fn calls(r: &Renderer<RecordingContext>) -> Vec<String> {
    r.context().borrow().calls.clone()
}

#[test]
fn missing_context_is_the_one_fatal_error() {
    let err = Renderer::new(&mut RecordingSurface { available: false }, None).unwrap_err();
    assert!(matches!(err, ReelError::Context(_)));
}

#[test]
fn empty_and_unknown_batches_make_no_calls() {
    let mut r = renderer();
    r.render(&[]);
    r.render(&[DrawCommand::Unknown]);
    let batch = decode_batch(serde_json::json!([
        { "type": "teleport", "x": 1 },
        { "type": "fillRect", "x": "wide" },
    ]));
    r.render(&batch);
    assert!(calls(&r).is_empty());
}

#[test]
fn nested_save_restore_brackets_the_translate() {
    let mut r = renderer();
    r.render(&[
        DrawCommand::Save,
        DrawCommand::Translate { x: 10.0, y: 20.0 },
        DrawCommand::Save,
        DrawCommand::Rotate { angle: 0.5 },
        DrawCommand::Restore,
        DrawCommand::Restore,
    ]);
    let ctx = r.context().borrow();
    assert_eq!(ctx.count("save"), 2);
    assert_eq!(ctx.count("restore"), 2);
    assert_eq!(
        ctx.names(),
        vec!["save", "translate", "save", "rotate", "restore", "restore"]
    );
}

#[test]
fn set_color_sets_fill_and_stroke_to_the_same_string() {
    let mut r = renderer();
    r.render(&[DrawCommand::SetColor {
        r: 300.0,
        g: -50.0,
        b: 128.0,
        a: None,
    }]);
    assert_eq!(
        calls(&r),
        vec!["set_fill_style(#ff0080)", "set_stroke_style(#ff0080)"]
    );

    r.render(&[DrawCommand::SetColor {
        r: 1.0,
        g: 2.0,
        b: 3.0,
        a: Some(128.0),
    }]);
    let ctx = r.context().borrow();
    let Some(Paint::Color(fill)) = &ctx.fill_style else {
        panic!("fill style not a color");
    };
    assert!(fill.starts_with("rgba(1, 2, 3, 0.50196"));
    assert_eq!(ctx.stroke_style, ctx.fill_style);
}

#[test]
fn shapes_map_to_their_native_sequences() {
    let mut r = renderer();
    r.render(&[
        DrawCommand::Rect {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
        },
        DrawCommand::Circle {
            x: 5.0,
            y: 5.0,
            radius: 2.0,
        },
        DrawCommand::FillCircle {
            x: 5.0,
            y: 5.0,
            radius: 2.0,
        },
        DrawCommand::Line {
            x1: 0.0,
            y1: 0.0,
            x2: 9.0,
            y2: 9.0,
        },
    ]);
    let ctx = r.context().borrow();
    assert_eq!(
        ctx.names(),
        vec![
            "stroke_rect",
            "begin_path",
            "arc",
            "stroke",
            "begin_path",
            "arc",
            "fill",
            "begin_path",
            "move_to",
            "line_to",
            "stroke",
        ]
    );
    assert_eq!(ctx.calls[2], format!("arc(5, 5, 2, 0, {}, false)", TAU));
    assert_eq!(ctx.calls[6], "fill(NonZero)");
}

#[test]
fn path_building_commands_pass_through() {
    let mut r = renderer();
    let batch = decode_batch(serde_json::json!([
        { "type": "beginPath" },
        { "type": "moveTo", "x": 1, "y": 2 },
        { "type": "arc", "x": 5, "y": 5, "radius": 3, "startAngle": 0, "endAngle": 1,
          "counterclockwise": true },
        { "type": "roundRect", "x": 0, "y": 0, "width": 10, "height": 10, "radii": [1, 2] },
        { "type": "closePath" },
        { "type": "fill", "fillRule": "evenodd" },
        { "type": "clip" },
    ]));
    r.render(&batch);
    assert_eq!(
        calls(&r),
        vec![
            "begin_path",
            "move_to(1, 2)",
            "arc(5, 5, 3, 0, 1, true)",
            "round_rect(0, 0, 10, 10, [1.0, 2.0, 1.0, 2.0])",
            "close_path",
            "fill(EvenOdd)",
            "clip(NonZero)",
        ]
    );
}

#[test]
fn gradient_descriptor_adds_stops_in_order() {
    let mut r = renderer();
    let batch = decode_batch(serde_json::json!([{
        "type": "setFillStyle",
        "style": {
            "type": "linear", "x0": 0, "y0": 0, "x1": 10, "y1": 0,
            "stops": [
                { "offset": 0, "color": "red" },
                { "offset": 0.5, "color": "lime" },
                { "offset": 1, "color": "blue" }
            ]
        }
    }]));
    r.render(&batch);
    let ctx = r.context().borrow();
    assert_eq!(
        ctx.names(),
        vec!["create_linear_gradient", "set_fill_style"]
    );
    let Some(Paint::Gradient(g)) = &ctx.fill_style else {
        panic!("fill style not a gradient");
    };
    let colors: Vec<&str> = g.stops.iter().map(|(_, c)| c.as_str()).collect();
    assert_eq!(colors, vec!["red", "lime", "blue"]);
}

#[test]
fn missing_image_skips_draw_and_pattern() {
    let images = ImageCache::new();
    let mut r = Renderer::new(&mut RecordingSurface { available: true }, Some(images.clone()))
        .unwrap();
    let batch = decode_batch(serde_json::json!([
        { "type": "drawImage", "name": "ghost", "x": 0, "y": 0 },
        { "type": "setFillStyle", "style": { "type": "pattern", "image": "ghost" } },
        { "type": "setStrokeStyle", "style": { "type": "pattern", "image": "ghost",
          "repetition": "no-repeat" } },
    ]));
    r.render(&batch);
    assert!(calls(&r).is_empty());

    images.set("ghost", RasterImage::solid(2, 3, [9, 9, 9, 255]).unwrap());
    r.render(&batch);
    assert_eq!(
        calls(&r),
        vec![
            "draw_image(2x3, 0, 0, None)",
            "create_pattern(Repeat)",
            "set_fill_style(pattern[2x3])",
            "create_pattern(NoRepeat)",
            "set_stroke_style(pattern[2x3])",
        ]
    );
    let ctx = r.context().borrow();
    let Some(Paint::Pattern(p)) = &ctx.stroke_style else {
        panic!("stroke style not a pattern");
    };
    assert_eq!(p.repetition, Repetition::NoRepeat);
}

#[test]
fn draw_image_without_cache_is_skipped() {
    let mut r = renderer();
    r.render(&[DrawCommand::DrawImage {
        name: "a".into(),
        x: 0.0,
        y: 0.0,
        width: Some(4.0),
        height: Some(4.0),
    }]);
    assert!(calls(&r).is_empty());
}

#[test]
fn font_state_is_tracked_in_two_parts() {
    let mut r = renderer();
    r.render(&[
        DrawCommand::SetFontSize { size: 24.0 },
        DrawCommand::SetFontFamily {
            family: "Inter".into(),
        },
    ]);
    assert_eq!(calls(&r), vec!["set_font(24px sans-serif)", "set_font(24px Inter)"]);
}

#[test]
fn invalid_font_sizes_keep_the_previous_size() {
    let mut r = renderer();
    r.render(&[
        DrawCommand::SetFontSize { size: 20.0 },
        DrawCommand::SetFontSize { size: f64::NAN },
        DrawCommand::SetFontSize { size: 0.0 },
        DrawCommand::SetFontSize { size: -4.0 },
        DrawCommand::SetFontSize {
            size: f64::INFINITY,
        },
        DrawCommand::SetFontFamily {
            family: "Inter".into(),
        },
    ]);
    assert_eq!(calls(&r), vec!["set_font(20px sans-serif)", "set_font(20px Inter)"]);
}

#[test]
fn text_overrides_do_not_persist() {
    let mut r = Renderer::with_opts(
        &mut RecordingSurface { available: true },
        None,
        RendererOpts::default()
            .with_default_font_size(12.0)
            .with_default_font_family("serif"),
    )
    .unwrap();
    r.render(&[
        DrawCommand::Text {
            text: "hi".into(),
            x: 1.0,
            y: 2.0,
            font_size: Some(40.0),
            font_family: None,
        },
        DrawCommand::Text {
            text: "plain".into(),
            x: 0.0,
            y: 0.0,
            font_size: None,
            font_family: None,
        },
        DrawCommand::SetFontFamily {
            family: "mono".into(),
        },
    ]);
    assert_eq!(
        calls(&r),
        vec![
            "set_font(40px serif)",
            "fill_text(hi, 1, 2)",
            "set_font(12px serif)",
            "fill_text(plain, 0, 0)",
            "set_font(12px mono)",
        ]
    );
}

#[test]
fn shadow_shorthands_expand() {
    let mut r = renderer();
    r.render(&[
        DrawCommand::SetShadow {
            color: "black".into(),
            blur: 4.0,
            offset_x: 2.0,
            offset_y: 3.0,
        },
        DrawCommand::ClearShadow,
    ]);
    assert_eq!(
        calls(&r),
        vec![
            "set_shadow_color(black)",
            "set_shadow_blur(4)",
            "set_shadow_offset_x(2)",
            "set_shadow_offset_y(3)",
            "set_shadow_color(rgba(0, 0, 0, 0))",
            "set_shadow_blur(0)",
            "set_shadow_offset_x(0)",
            "set_shadow_offset_y(0)",
        ]
    );
}

#[test]
fn stored_paths_resolve_at_replay_time() {
    let paths = Rc::new(RefCell::new(PathRegistry::new()));
    let mut r = renderer();
    r.set_paths(Some(Rc::clone(&paths)));

    let id = paths.borrow_mut().create_path(None);
    let batch = vec![
        DrawCommand::FillPath {
            id,
            fill_rule: Some(FillRule::EvenOdd),
        },
        DrawCommand::StrokePath {
            id,
            fill_rule: None,
        },
    ];
    // Geometry added after the command was queued is still used.
    paths.borrow_mut().rect(id, 0.0, 0.0, 2.0, 2.0);
    r.render(&batch);
    assert_eq!(calls(&r), vec!["fill_path(5, EvenOdd)", "stroke_path(5)"]);

    paths.borrow_mut().dispose_path(id);
    r.render(&batch);
    r.render(&[DrawCommand::ClipPath {
        id: PathHandle(404),
        fill_rule: None,
    }]);
    assert_eq!(calls(&r).len(), 2);
}

#[test]
fn put_image_data_encodings_agree_and_input_is_untouched() {
    let r = renderer();
    let plain = PixelData::Plain(vec![255.0, 0.0, 128.0, 255.0, 1.0, 2.0, 3.0, 4.0]);
    let packed = PixelData::Packed(vec![255, 0, 128, 255, 1, 2, 3, 4]);
    let before = plain.clone();

    r.put_image_data(&plain, 2, 1, 0, 0, None);
    let from_plain = r.context().borrow().last_put.clone().unwrap();
    r.put_image_data(&packed, 2, 1, 0, 0, None);
    let from_packed = r.context().borrow().last_put.clone().unwrap();

    assert_eq!(from_plain, from_packed);
    assert_eq!(plain, before);
}

#[test]
fn put_image_data_pads_short_input() {
    let r = renderer();
    r.put_image_data(&PixelData::Packed(vec![7; 5]), 2, 2, 0, 0, None);
    let put = r.context().borrow().last_put.clone().unwrap();
    assert_eq!(put.data.len(), 16);
    assert_eq!(&put.data[..6], &[7, 7, 7, 7, 7, 0]);
}

#[test]
fn put_image_data_command_carries_dirty_rect() {
    let mut r = renderer();
    let batch = decode_batch(serde_json::json!([{
        "type": "putImageData", "data": [1, 2, 3, 4], "width": 1, "height": 1,
        "dx": 3.9, "dy": -2.5, "dirtyWidth": 1
    }]));
    r.render(&batch);
    assert_eq!(
        calls(&r),
        vec!["put_image_data(1x1, 3, -2, Some(DirtyRect { x: 0, y: 0, width: 1, height: 1 }))"]
    );
}

#[test]
fn oversized_put_image_data_is_skipped() {
    let mut r = renderer();
    let batch = decode_batch(serde_json::json!([
        { "type": "putImageData", "data": [], "width": 4294967295u32, "height": 4294967295u32,
          "dx": 0, "dy": 0 },
        { "type": "putImageData", "data": [], "width": 100000, "height": 100000, "dx": 0, "dy": 0 },
        { "type": "putImageData", "data": [9, 9, 9, 9], "width": 1, "height": 1, "dx": 0, "dy": 0 },
    ]));
    assert_eq!(batch.len(), 3);
    r.render(&batch);
    assert_eq!(calls(&r), vec!["put_image_data(1x1, 0, 0, None)"]);

    r.put_image_data(&PixelData::Packed(Vec::new()), u32::MAX, u32::MAX, 0, 0, None);
    assert_eq!(calls(&r).len(), 1);
}

#[test]
fn oversized_image_data_requests_come_back_empty() {
    let r = renderer();
    let blank = r.create_image_data(u32::MAX, u32::MAX);
    assert_eq!((blank.width, blank.height), (0, 0));
    assert!(blank.data.is_empty());

    let read = r.get_image_data(0, 0, u32::MAX, 2);
    assert_eq!((read.width, read.height), (0, 0));
    assert!(read.data.is_empty());

    let small = r.create_image_data(3, 2);
    assert_eq!(small.data.len(), 24);
}

#[test]
fn hit_tester_follows_the_context_lifetime() {
    let r = renderer();
    r.context().borrow_mut().hit_answer = true;
    let tester = r.hit_tester();
    let path = Path2D::new();
    assert!(tester.is_point_in_path(&path, 0.0, 0.0, FillRule::NonZero));
    assert!(r.is_point_in_stroke(&path, 0.0, 0.0));

    {
        let _busy = r.context().borrow_mut();
        assert!(!tester.is_point_in_stroke(&path, 0.0, 0.0));
    }

    drop(r);
    assert!(!tester.is_point_in_path(&path, 0.0, 0.0, FillRule::NonZero));
}

#[test]
fn no_implicit_reset_between_batches() {
    let mut r = renderer();
    r.render(&[DrawCommand::FillRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    }]);
    r.render(&[DrawCommand::Clear]);
    assert_eq!(calls(&r), vec!["fill_rect(0, 0, 1, 1)", "clear"]);
}
