use super::*;
use crate::render::recording::init_tracing;

fn ctx(w: u32, h: u32) -> CpuContext {
    init_tracing();
    PixelSurface::new(w, h)
        .context_2d()
        .expect("surface has a context")
}

fn px(ctx: &mut CpuContext, x: i32, y: i32) -> [u8; 4] {
    let d = ctx.get_image_data(x, y, 1, 1).data;
    [d[0], d[1], d[2], d[3]]
}

const RED: [u8; 4] = [255, 0, 0, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

#[test]
fn context_requires_usable_dimensions() {
    assert!(PixelSurface::new(0, 10).context_2d().is_none());
    assert!(PixelSurface::new(10, 0).context_2d().is_none());
    assert!(PixelSurface::new(70_000, 10).context_2d().is_none());
    let c = ctx(12, 7);
    assert_eq!((c.width(), c.height()), (12, 7));
}

#[test]
fn fill_rect_paints_only_covered_pixels() {
    let mut c = ctx(32, 32);
    c.set_fill_style(Paint::from("red"));
    c.fill_rect(8.0, 8.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 12, 12), RED);
    assert_eq!(px(&mut c, 2, 2), CLEAR);
    assert_eq!(px(&mut c, 20, 20), CLEAR);
}

#[test]
fn surface_starts_with_clear_color() {
    let mut c = PixelSurface::new(4, 4)
        .with_opts(SurfaceOpts::default().with_clear_rgba([0, 0, 255, 255]))
        .context_2d()
        .expect("context");
    assert_eq!(px(&mut c, 1, 1), [0, 0, 255, 255]);
}

#[test]
fn clear_resets_every_pixel() {
    let mut c = ctx(16, 16);
    c.set_fill_style(Paint::from("#00ff00"));
    c.fill_rect(0.0, 0.0, 16.0, 16.0);
    assert_eq!(px(&mut c, 3, 3), [0, 255, 0, 255]);
    c.clear();
    assert_eq!(px(&mut c, 3, 3), CLEAR);
}

#[test]
fn earlier_pixels_survive_later_drawing() {
    let mut c = ctx(32, 32);
    c.set_fill_style(Paint::from("red"));
    c.fill_rect(0.0, 0.0, 4.0, 4.0);
    assert_eq!(px(&mut c, 1, 1), RED);
    c.set_fill_style(Paint::from("blue"));
    c.fill_rect(16.0, 16.0, 4.0, 4.0);
    assert_eq!(px(&mut c, 1, 1), RED);
    assert_eq!(px(&mut c, 17, 17), [0, 0, 255, 255]);
}

#[test]
fn clip_limits_drawing_until_restore() {
    let mut c = ctx(32, 32);
    c.set_fill_style(Paint::from("red"));
    c.save();
    c.begin_path();
    c.rect(0.0, 0.0, 8.0, 8.0);
    c.clip(FillRule::NonZero);
    c.fill_rect(0.0, 0.0, 32.0, 32.0);
    assert_eq!(px(&mut c, 4, 4), RED);
    assert_eq!(px(&mut c, 20, 20), CLEAR);

    c.restore();
    c.fill_rect(16.0, 16.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 20, 20), RED);
}

#[test]
fn global_alpha_scales_coverage() {
    let mut c = ctx(8, 8);
    c.set_fill_style(Paint::from("red"));
    c.set_global_alpha(0.5);
    c.fill_rect(0.0, 0.0, 8.0, 8.0);
    let [r, g, b, a] = px(&mut c, 4, 4);
    assert!((126..=130).contains(&a), "alpha {a}");
    assert!(r > 250, "unpremultiplied red {r}");
    assert_eq!((g, b), (0, 0));

    // Out-of-range values are ignored.
    c.set_global_alpha(2.0);
    assert_eq!(c.state.alpha, 0.5);
}

#[test]
fn zero_alpha_draws_nothing() {
    let mut c = ctx(8, 8);
    c.set_global_alpha(0.0);
    c.fill_rect(0.0, 0.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 4, 4), CLEAR);
}

#[test]
fn invalid_colors_keep_previous_style() {
    let mut c = ctx(8, 8);
    c.set_fill_style(Paint::from("red"));
    c.set_fill_style(Paint::from("definitely-not-a-color"));
    c.fill_rect(0.0, 0.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 4, 4), RED);
}

#[test]
fn save_restore_round_trips_fill_style() {
    let mut c = ctx(16, 8);
    c.set_fill_style(Paint::from("red"));
    c.save();
    c.set_fill_style(Paint::from("blue"));
    c.restore();
    c.fill_rect(0.0, 0.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 4, 4), RED);

    // Unbalanced restore is a no-op.
    c.restore();
    c.fill_rect(8.0, 0.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 12, 4), RED);
}

#[test]
fn arc_follows_current_transform() {
    let mut c = ctx(32, 32);
    c.set_fill_style(Paint::from("red"));
    c.translate(16.0, 16.0);
    c.begin_path();
    c.arc(0.0, 0.0, 6.0, 0.0, std::f64::consts::TAU, false);
    c.fill(FillRule::NonZero);
    assert_eq!(px(&mut c, 16, 16), RED);
    assert_eq!(px(&mut c, 2, 2), CLEAR);
}

#[test]
fn clear_rect_erases_inside_region() {
    let mut c = ctx(16, 16);
    c.set_fill_style(Paint::from("red"));
    c.fill_rect(0.0, 0.0, 16.0, 16.0);
    c.clear_rect(4.0, 4.0, 4.0, 4.0);
    assert_eq!(px(&mut c, 5, 5), CLEAR);
    assert_eq!(px(&mut c, 12, 12), RED);
}

#[test]
fn reads_outside_surface_are_transparent() {
    let mut c = ctx(4, 4);
    c.set_fill_style(Paint::from("red"));
    c.fill_rect(0.0, 0.0, 4.0, 4.0);
    let data = c.get_image_data(-2, -2, 4, 4);
    assert_eq!(data.pixel(0, 0), Some(CLEAR));
    assert_eq!(data.pixel(1, 1), Some(CLEAR));
    assert_eq!(data.pixel(2, 2), Some(RED));
    assert_eq!(data.pixel(3, 3), Some(RED));
}

#[test]
fn put_image_data_replaces_pixels_without_blending() {
    let mut c = ctx(8, 8);
    c.set_fill_style(Paint::from("red"));
    c.fill_rect(0.0, 0.0, 8.0, 8.0);

    let mut img = ImageData::new(2, 2);
    img.data[0..4].copy_from_slice(&[0, 0, 255, 255]);
    // Remaining pixels are transparent and must overwrite the red beneath.
    c.put_image_data(&img, 3, 3, None);
    assert_eq!(px(&mut c, 3, 3), [0, 0, 255, 255]);
    assert_eq!(px(&mut c, 4, 4), CLEAR);
    assert_eq!(px(&mut c, 5, 5), RED);
}

#[test]
fn put_image_data_honors_dirty_rect_and_bounds() {
    let mut c = ctx(4, 4);
    let mut img = ImageData::new(2, 2);
    for p in img.data.chunks_exact_mut(4) {
        p.copy_from_slice(&RED);
    }
    let dirty = DirtyRect {
        x: 1,
        y: 1,
        width: 5,
        height: 5,
    };
    c.put_image_data(&img, -1, -1, Some(dirty));
    assert_eq!(px(&mut c, 0, 0), RED);
    assert_eq!(px(&mut c, 1, 1), CLEAR);

    let empty = DirtyRect {
        x: 0,
        y: 0,
        width: 0,
        height: 2,
    };
    c.put_image_data(&img, 2, 2, Some(empty));
    assert_eq!(px(&mut c, 2, 2), CLEAR);
}

#[test]
fn put_then_get_preserves_translucent_pixels() {
    let mut c = ctx(2, 1);
    let mut img = ImageData::new(2, 1);
    img.data.copy_from_slice(&[255, 0, 0, 255, 0, 0, 255, 0]);
    c.put_image_data(&img, 0, 0, None);
    let back = c.get_image_data(0, 0, 2, 1);
    assert_eq!(back.pixel(0, 0), Some(RED));
    // Fully transparent pixels lose their color channels.
    assert_eq!(back.pixel(1, 0), Some(CLEAR));
}

#[test]
fn hit_tests_map_through_current_transform() {
    let mut c = ctx(32, 32);
    let mut path = Path2D::new();
    path.rect(0.0, 0.0, 5.0, 5.0);
    assert!(c.is_point_in_path(&path, 2.0, 2.0, FillRule::NonZero));

    c.translate(10.0, 10.0);
    assert!(c.is_point_in_path(&path, 12.0, 12.0, FillRule::NonZero));
    assert!(!c.is_point_in_path(&path, 2.0, 2.0, FillRule::NonZero));

    c.set_line_width(2.0);
    assert!(c.is_point_in_stroke(&path, 10.5, 12.0));
    assert!(!c.is_point_in_stroke(&path, 12.5, 12.5));

    c.scale(0.0, 0.0);
    assert!(!c.is_point_in_path(&path, 10.0, 10.0, FillRule::NonZero));
}

#[test]
fn line_state_setters_reject_invalid_values() {
    let mut c = ctx(4, 4);
    c.set_line_width(-1.0);
    c.set_line_width(f64::NAN);
    assert_eq!(c.state.line.width, 1.0);

    c.set_line_dash(&[1.0, 2.0, 3.0]);
    assert_eq!(c.state.line.dash, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    c.set_line_dash(&[1.0, -2.0]);
    assert_eq!(c.state.line.dash.len(), 6);
    c.set_line_dash(&[]);
    assert!(c.state.line.dash.is_empty());

    c.set_miter_limit(0.0);
    assert_eq!(c.state.line.miter_limit, 10.0);
}

#[test]
fn composite_names_map_to_blend_modes() {
    assert_eq!(composite_to_blend("source-over"), Some(None));
    assert!(matches!(composite_to_blend("multiply"), Some(Some(_))));
    assert_eq!(composite_to_blend("plus-darker"), None);

    let mut c = ctx(4, 4);
    c.set_global_composite_operation("xor");
    assert!(c.state.blend.is_some());
    c.set_global_composite_operation("bogus");
    assert!(c.state.blend.is_some());
    c.set_global_composite_operation("source-over");
    assert!(c.state.blend.is_none());
}

#[test]
fn text_without_registered_font_draws_nothing() {
    let mut c = ctx(16, 16);
    c.set_font("12px Nowhere Sans");
    c.fill_text("hello", 1.0, 12.0);
    assert_eq!(c.premul_rgba8().iter().copied().max(), Some(0));

    c.set_font("not a font");
    assert_eq!(c.state.font, "12px Nowhere Sans");
}

#[test]
fn draw_image_scales_into_destination() {
    let img = RasterImage::solid(2, 2, RED).expect("solid image");
    let mut c = ctx(16, 16);
    c.draw_image(&img, 4.0, 4.0, Some((8.0, 8.0)));
    assert_eq!(px(&mut c, 8, 8), RED);
    assert_eq!(px(&mut c, 2, 2), CLEAR);
    assert_eq!(px(&mut c, 13, 13), CLEAR);
}

#[test]
fn single_stop_gradient_is_solid() {
    let mut g = CanvasGradient::new(GradientKind::Linear {
        x0: 0.0,
        y0: 0.0,
        x1: 8.0,
        y1: 0.0,
    });
    g.add_color_stop(0.5, "red");
    let mut c = ctx(8, 8);
    c.set_fill_style(Paint::Gradient(g));
    c.fill_rect(0.0, 0.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 1, 1), RED);
}

#[test]
fn repeating_pattern_tiles_the_fill() {
    let img = Arc::new(RasterImage::solid(2, 2, RED).expect("solid image"));
    let mut c = ctx(8, 8);
    let pattern = c.create_pattern(&img, Repetition::Repeat);
    c.set_fill_style(Paint::Pattern(pattern));
    c.fill_rect(0.0, 0.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 6, 6), RED);

    let mut c = ctx(8, 8);
    let pattern = c.create_pattern(&img, Repetition::NoRepeat);
    c.set_fill_style(Paint::Pattern(pattern));
    c.fill_rect(0.0, 0.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 1, 1), RED);
    assert_eq!(px(&mut c, 6, 6), CLEAR);
}

#[test]
fn hard_shadow_is_offset_copy_under_the_shape() {
    let mut c = ctx(32, 32);
    c.set_shadow_color("blue");
    c.set_shadow_offset_x(6.0);
    c.set_shadow_offset_y(6.0);
    c.set_fill_style(Paint::from("red"));
    c.fill_rect(4.0, 4.0, 8.0, 8.0);
    assert_eq!(px(&mut c, 6, 6), RED);
    assert_eq!(px(&mut c, 15, 15), [0, 0, 255, 255]);
    assert_eq!(px(&mut c, 25, 25), CLEAR);
}

#[test]
fn shadow_blur_spreads_past_the_shape_edge() {
    let mut c = ctx(64, 64);
    c.set_shadow_color("black");
    c.set_shadow_blur(12.0);
    c.set_fill_style(Paint::from("red"));
    c.fill_rect(20.0, 20.0, 24.0, 24.0);

    assert_eq!(px(&mut c, 32, 32), RED);
    let near = px(&mut c, 16, 32);
    assert!(near[3] > 0, "expected shadow alpha at 4px outside, got {near:?}");
    assert!(near[3] > px(&mut c, 4, 32)[3]);
    assert_eq!(px(&mut c, 0, 0), CLEAR);
}

#[test]
fn blurred_shadow_respects_clip() {
    let mut c = ctx(64, 64);
    c.rect(0.0, 0.0, 32.0, 64.0);
    c.clip(FillRule::NonZero);
    c.set_shadow_color("black");
    c.set_shadow_blur(8.0);
    c.fill_rect(20.0, 20.0, 8.0, 8.0);
    assert!(px(&mut c, 30, 24)[3] > 0);
    assert_eq!(px(&mut c, 34, 24), CLEAR);
}

#[test]
fn oversized_get_image_data_is_empty() {
    let mut c = ctx(4, 4);
    let d = c.get_image_data(0, 0, u32::MAX, u32::MAX);
    assert_eq!((d.width, d.height), (0, 0));
    assert!(d.data.is_empty());
    assert_eq!(c.create_image_data(100_000, 100_000).data.len(), 0);
}

#[test]
fn stroke_conversion_keeps_every_line_setting() {
    let line = LineStyle {
        width: 3.0,
        cap: LineCap::Round,
        join: LineJoin::Bevel,
        miter_limit: 4.0,
        dash: vec![2.0, 1.0],
        dash_offset: 0.5,
    };
    let s = stroke_to_cpu(&line.to_kurbo());
    assert_eq!(s.width, 3.0);
    assert_eq!(s.start_cap, vello_cpu::kurbo::Cap::Round);
    assert_eq!(s.end_cap, vello_cpu::kurbo::Cap::Round);
    assert_eq!(s.join, vello_cpu::kurbo::Join::Bevel);
    assert_eq!(s.miter_limit, 4.0);
    assert_eq!(&s.dash_pattern[..], &[2.0, 1.0]);
    assert_eq!(s.dash_offset, 0.5);

    let plain = stroke_to_cpu(&LineStyle::default().to_kurbo());
    assert!(plain.dash_pattern.is_empty());
    assert_eq!(plain.join, vello_cpu::kurbo::Join::Miter);
}
