use std::collections::HashMap;

use crate::foundation::error::{ReelError, ReelResult};
use crate::protocol::command::{TextAlign, TextBaseline};

/// Font request parsed from a CSS shorthand of the form `"{size}px {family}[, fallback...]"`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FontSpec {
    pub(crate) size_px: f32,
    pub(crate) families: Vec<String>,
}

/// Parse the renderer's font shorthand. Style and weight keywords before the size are skipped.
pub(crate) fn parse_font(css: &str) -> Option<FontSpec> {
    let mut rest = css.trim();
    let size_px = loop {
        let (token, tail) = rest.split_once(char::is_whitespace)?;
        if let Some(num) = token.strip_suffix("px") {
            rest = tail;
            break num.parse::<f32>().ok()?;
        }
        rest = tail.trim_start();
    };
    if !size_px.is_finite() || size_px <= 0.0 {
        return None;
    }
    let families: Vec<String> = rest
        .split(',')
        .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').to_owned())
        .filter(|f| !f.is_empty())
        .collect();
    if families.is_empty() {
        return None;
    }
    Some(FontSpec { size_px, families })
}

/// Horizontal shift applied to a line of `width` pixels for the given alignment.
pub(crate) fn align_offset(align: TextAlign, width: f32) -> f32 {
    match align {
        TextAlign::Start | TextAlign::Left => 0.0,
        TextAlign::End | TextAlign::Right => -width,
        TextAlign::Center => -width / 2.0,
    }
}

/// Distance from the layout's alphabetic baseline to the requested anchor line.
///
/// `ascent` and `descent` are both positive distances from the baseline.
pub(crate) fn baseline_offset(baseline: TextBaseline, ascent: f32, descent: f32) -> f32 {
    match baseline {
        TextBaseline::Alphabetic => 0.0,
        TextBaseline::Top | TextBaseline::Hanging => -ascent,
        TextBaseline::Middle => (descent - ascent) / 2.0,
        TextBaseline::Bottom | TextBaseline::Ideographic => descent,
    }
}

/// Parley layout engine with fonts registered once per family.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    registered: HashMap<String, String>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            registered: HashMap::new(),
        }
    }

    /// Shape a single unwrapped line with the font registered as `family`.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        family: &str,
        font_bytes: &[u8],
        size_px: f32,
    ) -> ReelResult<parley::Layout<()>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::validation("font size must be finite and > 0"));
        }
        let family_name = self.family_name(family, font_bytes)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    fn family_name(&mut self, family: &str, font_bytes: &[u8]) -> ReelResult<String> {
        let key = family.trim().to_ascii_lowercase();
        if let Some(name) = self.registered.get(&key) {
            return Ok(name.clone());
        }
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| ReelError::asset(format!("font '{family}' has no usable faces")))?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::asset(format!("font '{family}' has no family name")))?
            .to_string();
        self.registered.insert(key, name.clone());
        Ok(name)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
