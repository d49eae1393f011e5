use crate::foundation::math::clamp_u8;

/// Canvas color string for `setColor`.
///
/// Channels are clamped to `[0, 255]` and rounded. Opaque colors format as lowercase `#rrggbb`;
/// anything else as `rgba(r, g, b, a)` with alpha as the exact ratio `a / 255`.
pub(crate) fn format_set_color(r: f64, g: f64, b: f64, a: Option<f64>) -> String {
    let (r, g, b) = (clamp_u8(r), clamp_u8(g), clamp_u8(b));
    match a.map(clamp_u8) {
        None | Some(255) => format!("#{r:02x}{g:02x}{b:02x}"),
        Some(a) => format!("rgba({r}, {g}, {b}, {})", f64::from(a) / 255.0),
    }
}

/// Parse a CSS color into straight RGBA8. `None` for anything unparsable.
pub(crate) fn parse_css_color(s: &str) -> Option<[u8; 4]> {
    csscolorparser::parse(s.trim())
        .ok()
        .map(|c| c.to_rgba8())
}

#[cfg(test)]
#[path = "../../tests/unit/render/color.rs"]
mod tests;
