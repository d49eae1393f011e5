use crate::foundation::core::{DirtyRect, FillRule};
use crate::foundation::math::clamp_u8;
use crate::protocol::style::StyleValue;

/// Opaque identifier of a registry-owned path.
///
/// Serialized as a bare integer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PathHandle(pub u64);

/// Corner radii for `roundRect`: a single number or a 1–4 element list.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum RoundRectRadii {
    /// Same radius on every corner.
    Uniform(f64),
    /// CSS-style corner list.
    List(Vec<f64>),
}

impl RoundRectRadii {
    /// Expand into `[top_left, top_right, bottom_right, bottom_left]`.
    ///
    /// An empty list means square corners; entries past the fourth are ignored. Negative or
    /// non-finite radii become 0.
    pub fn corners(&self) -> [f64; 4] {
        let [tl, tr, br, bl] = match self {
            Self::Uniform(r) => [*r; 4],
            Self::List(v) => match v.as_slice() {
                [] => [0.0; 4],
                [a] => [*a; 4],
                [a, b] => [*a, *b, *a, *b],
                [a, b, c] => [*a, *b, *c, *b],
                [a, b, c, d, ..] => [*a, *b, *c, *d],
            },
        };
        let sane = |r: f64| if r.is_finite() { r.max(0.0) } else { 0.0 };
        [sane(tl), sane(tr), sane(br), sane(bl)]
    }
}

impl From<f64> for RoundRectRadii {
    fn from(r: f64) -> Self {
        Self::Uniform(r)
    }
}

/// Raw RGBA pixel values in either of the two accepted encodings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PixelData {
    /// Packed bytes, four per pixel.
    Packed(Vec<u8>),
    /// Plain numbers, clamped and rounded into bytes.
    Plain(Vec<f64>),
}

impl PixelData {
    /// Number of channel values.
    pub fn len(&self) -> usize {
        match self {
            Self::Packed(v) => v.len(),
            Self::Plain(v) => v.len(),
        }
    }

    /// `true` when no channel values are present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy into exactly `len` bytes, zero-padding or truncating.
    ///
    /// The source is never modified.
    pub fn to_bytes(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        match self {
            Self::Packed(v) => {
                let n = v.len().min(len);
                out[..n].copy_from_slice(&v[..n]);
            }
            Self::Plain(v) => {
                for (dst, &src) in out.iter_mut().zip(v.iter()) {
                    *dst = clamp_u8(src);
                }
            }
        }
        out
    }
}

impl From<Vec<u8>> for PixelData {
    fn from(v: Vec<u8>) -> Self {
        Self::Packed(v)
    }
}

impl From<Vec<f64>> for PixelData {
    fn from(v: Vec<f64>) -> Self {
        Self::Plain(v)
    }
}

/// Horizontal text alignment relative to the draw position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Same as `left` for left-to-right text.
    #[default]
    Start,
    /// Same as `right` for left-to-right text.
    End,
    /// Text begins at the position.
    Left,
    /// Text ends at the position.
    Right,
    /// Text is centered on the position.
    Center,
}

/// Vertical text anchor relative to the draw position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBaseline {
    /// Top of the em box.
    Top,
    /// Hanging baseline.
    Hanging,
    /// Middle of the em box.
    Middle,
    /// Alphabetic baseline.
    #[default]
    Alphabetic,
    /// Ideographic baseline.
    Ideographic,
    /// Bottom of the em box.
    Bottom,
}

/// End cap of stroked lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    /// Flat end at the endpoint.
    #[default]
    Butt,
    /// Semicircular end.
    Round,
    /// Square end extending past the endpoint.
    Square,
}

/// Corner shape of stroked lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    /// Rounded corner.
    Round,
    /// Beveled corner.
    Bevel,
    /// Sharp corner, limited by the miter limit.
    #[default]
    Miter,
}

/// One drawing operation.
///
/// Serialized as a flat record `{ "type": "<tag>", ...fields }`. Tags that this build does not
/// know decode to [`DrawCommand::Unknown`] and are skipped by the renderer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DrawCommand {
    // Surface
    Clear,
    ClearRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },

    // Immediate shapes
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Circle {
        x: f64,
        y: f64,
        radius: f64,
    },
    FillCircle {
        x: f64,
        y: f64,
        radius: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        #[serde(default)]
        font_size: Option<f64>,
        #[serde(default)]
        font_family: Option<String>,
    },
    DrawImage {
        name: String,
        x: f64,
        y: f64,
        #[serde(default)]
        width: Option<f64>,
        #[serde(default)]
        height: Option<f64>,
    },

    // Transform
    Translate {
        x: f64,
        y: f64,
    },
    Rotate {
        angle: f64,
    },
    Scale {
        x: f64,
        y: f64,
    },
    Save,
    Restore,
    Transform {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        f: f64,
    },
    SetTransform {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        f: f64,
    },
    ResetTransform,

    // Current-path building
    BeginPath,
    ClosePath,
    MoveTo {
        x: f64,
        y: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    Arc {
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        #[serde(default)]
        counterclockwise: Option<bool>,
    },
    ArcTo {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        radius: f64,
    },
    Ellipse {
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        start_angle: f64,
        end_angle: f64,
        #[serde(default)]
        counterclockwise: Option<bool>,
    },
    QuadraticCurveTo {
        cpx: f64,
        cpy: f64,
        x: f64,
        y: f64,
    },
    BezierCurveTo {
        cp1x: f64,
        cp1y: f64,
        cp2x: f64,
        cp2y: f64,
        x: f64,
        y: f64,
    },
    RoundRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radii: RoundRectRadii,
    },
    Fill {
        #[serde(default)]
        fill_rule: Option<FillRule>,
    },
    Stroke,
    Clip {
        #[serde(default)]
        fill_rule: Option<FillRule>,
    },

    // Registry-backed paths, resolved at replay time
    FillPath {
        id: PathHandle,
        #[serde(default)]
        fill_rule: Option<FillRule>,
    },
    StrokePath {
        id: PathHandle,
        #[serde(default)]
        fill_rule: Option<FillRule>,
    },
    ClipPath {
        id: PathHandle,
        #[serde(default)]
        fill_rule: Option<FillRule>,
    },

    // Style
    SetColor {
        r: f64,
        g: f64,
        b: f64,
        #[serde(default)]
        a: Option<f64>,
    },
    SetFillStyle {
        style: StyleValue,
    },
    SetStrokeStyle {
        style: StyleValue,
    },

    // Shadow
    SetShadowColor {
        color: String,
    },
    SetShadowBlur {
        blur: f64,
    },
    SetShadowOffsetX {
        offset: f64,
    },
    SetShadowOffsetY {
        offset: f64,
    },
    SetShadow {
        color: String,
        blur: f64,
        offset_x: f64,
        offset_y: f64,
    },
    ClearShadow,

    // Compositing and text
    SetGlobalAlpha {
        alpha: f64,
    },
    SetCompositeOperation {
        operation: String,
    },
    SetTextAlign {
        align: TextAlign,
    },
    SetTextBaseline {
        baseline: TextBaseline,
    },
    SetFontSize {
        size: f64,
    },
    SetFontFamily {
        family: String,
    },

    // Line style
    SetLineWidth {
        width: f64,
    },
    SetLineCap {
        cap: LineCap,
    },
    SetLineJoin {
        join: LineJoin,
    },
    SetMiterLimit {
        limit: f64,
    },
    SetLineDash {
        segments: Vec<f64>,
    },
    SetLineDashOffset {
        offset: f64,
    },

    // Pixel buffer
    PutImageData {
        data: PixelData,
        width: u32,
        height: u32,
        dx: f64,
        dy: f64,
        #[serde(default)]
        dirty_x: Option<i32>,
        #[serde(default)]
        dirty_y: Option<i32>,
        #[serde(default)]
        dirty_width: Option<i32>,
        #[serde(default)]
        dirty_height: Option<i32>,
    },

    /// Any tag this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl DrawCommand {
    /// Assemble the optional dirty rectangle of a `putImageData` command.
    ///
    /// Missing components default to the full source buffer.
    pub fn dirty_rect(&self) -> Option<DirtyRect> {
        let Self::PutImageData {
            width,
            height,
            dirty_x,
            dirty_y,
            dirty_width,
            dirty_height,
            ..
        } = self
        else {
            return None;
        };
        if dirty_x.is_none() && dirty_y.is_none() && dirty_width.is_none() && dirty_height.is_none()
        {
            return None;
        }
        Some(DirtyRect {
            x: dirty_x.unwrap_or(0),
            y: dirty_y.unwrap_or(0),
            width: dirty_width.unwrap_or(i32::try_from(*width).unwrap_or(i32::MAX)),
            height: dirty_height.unwrap_or(i32::try_from(*height).unwrap_or(i32::MAX)),
        })
    }
}
