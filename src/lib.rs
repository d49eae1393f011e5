//! canvasreel replays serializable 2D drawing commands onto a native canvas context.
//!
//! A guest describes each frame as a batch of [`DrawCommand`] records. Paths and images never
//! cross the boundary; they live in a [`PathRegistry`] and an [`ImageCache`] and are referenced
//! by handle or name. A [`Renderer`] interprets batches against any [`Context2d`], and
//! [`CpuContext`] provides one backed by `vello_cpu`.
//!
//! - Decode batches with [`decode_batch`] / [`decode_batch_str`]
//! - Wire everything together with a [`Session`]
//! - Gate production with [`PlaybackControl`]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assets;
mod foundation;
mod paths;
mod protocol;

/// Command interpreter, context traits and backends.
pub mod render;
/// Session wiring, playback control and batch transport.
pub mod session;

pub use crate::foundation::core::{Affine, BezPath, DirtyRect, FillRule, Point, Rect, Vec2};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::assets::decode::decode_image;
pub use crate::assets::fonts::FontStore;
pub use crate::assets::image_cache::{ImageCache, RasterImage};
pub use crate::paths::path2d::Path2D;
pub use crate::paths::registry::{HitTest, PathRegistry};
pub use crate::protocol::batch::{
    CommandQueue, CommandSink, decode_batch, decode_batch_str, decode_command, decode_frames_str,
};
pub use crate::protocol::command::{
    DrawCommand, LineCap, LineJoin, PathHandle, PixelData, RoundRectRadii, TextAlign,
    TextBaseline,
};
pub use crate::protocol::style::{GradientStop, Repetition, StyleDescriptor, StyleValue};
pub use crate::render::context::{
    CanvasGradient, CanvasPattern, Context2d, GradientKind, ImageData, MAX_IMAGE_DATA_BYTES, Paint,
    Surface,
};
pub use crate::render::cpu::{CpuContext, PixelSurface, SurfaceOpts};
pub use crate::render::renderer::{Renderer, RendererOpts};
pub use crate::session::channel::{BatchReceiver, BatchSender, batch_channel};
pub use crate::session::control::{FrameGrant, PlaybackControl, PlaybackMode};
pub use crate::session::reel_session::{Session, SessionOpts};
