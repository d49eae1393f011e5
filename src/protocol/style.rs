//! Declarative fill/stroke styles.
//!
//! A style never carries a native gradient or pattern object; the renderer builds those from the
//! descriptor at replay time.

/// One color stop of a gradient.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    /// Position along the gradient in `[0, 1]`.
    pub offset: f64,
    /// CSS color string.
    pub color: String,
}

/// How a pattern image tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Repetition {
    /// Tile on both axes.
    #[default]
    #[serde(rename = "repeat")]
    Repeat,
    /// Tile horizontally only.
    #[serde(rename = "repeat-x")]
    RepeatX,
    /// Tile vertically only.
    #[serde(rename = "repeat-y")]
    RepeatY,
    /// Draw the image once.
    #[serde(rename = "no-repeat")]
    NoRepeat,
}

/// Tagged style descriptor consumed by `setFillStyle` / `setStrokeStyle`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StyleDescriptor {
    /// A plain CSS color.
    Solid {
        /// CSS color string.
        color: String,
    },
    /// Linear gradient between two points.
    Linear {
        /// Start x.
        x0: f64,
        /// Start y.
        y0: f64,
        /// End x.
        x1: f64,
        /// End y.
        y1: f64,
        /// Stops, applied in order.
        #[serde(default)]
        stops: Vec<GradientStop>,
    },
    /// Two-circle radial gradient.
    Radial {
        /// Start circle center x.
        x0: f64,
        /// Start circle center y.
        y0: f64,
        /// Start circle radius.
        r0: f64,
        /// End circle center x.
        x1: f64,
        /// End circle center y.
        y1: f64,
        /// End circle radius.
        r1: f64,
        /// Stops, applied in order.
        #[serde(default)]
        stops: Vec<GradientStop>,
    },
    /// Conic (sweep) gradient around a center.
    Conic {
        /// Angle in radians where the sweep begins.
        start_angle: f64,
        /// Center x.
        x: f64,
        /// Center y.
        y: f64,
        /// Stops, applied in order.
        #[serde(default)]
        stops: Vec<GradientStop>,
    },
    /// Image pattern looked up by name in the image cache.
    Pattern {
        /// Image cache key.
        image: String,
        /// Tiling mode.
        #[serde(default)]
        repetition: Repetition,
    },
}

/// Value accepted by `setFillStyle` / `setStrokeStyle`: a color string or a descriptor.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    /// Plain CSS color string.
    Color(String),
    /// Structured descriptor.
    Descriptor(StyleDescriptor),
}

impl From<&str> for StyleValue {
    fn from(color: &str) -> Self {
        Self::Color(color.to_string())
    }
}

impl From<StyleDescriptor> for StyleValue {
    fn from(d: StyleDescriptor) -> Self {
        Self::Descriptor(d)
    }
}
