use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::assets::decode::decode_image;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl RasterImage {
    /// Build from straight-alpha RGBA8 bytes.
    pub fn from_straight_rgba8(width: u32, height: u32, mut rgba: Vec<u8>) -> ReelResult<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if rgba.len() != expected {
            return Err(ReelError::validation(format!(
                "image byte len {} does not match {width}x{height}",
                rgba.len()
            )));
        }
        premultiply_rgba8_in_place(&mut rgba);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba),
        })
    }

    /// Single-color image, mostly useful for patterns and tests.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> ReelResult<Self> {
        let n = (width as usize).saturating_mul(height as usize);
        Self::from_straight_rgba8(width, height, rgba.repeat(n))
    }
}

/// Name-keyed store of decoded images shared between asset loading and the renderer.
///
/// Cloning is cheap and yields another handle onto the same store. A lookup miss is never an
/// error; callers skip the operation that needed the image.
#[derive(Clone, Debug, Default)]
pub struct ImageCache {
    inner: Rc<RefCell<HashMap<String, Arc<RasterImage>>>>,
}

impl ImageCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the image stored under `name`.
    pub fn set(&self, name: impl Into<String>, image: RasterImage) {
        self.inner.borrow_mut().insert(name.into(), Arc::new(image));
    }

    /// Decode encoded image bytes (PNG, JPEG) and store them under `name`.
    pub fn load(&self, name: impl Into<String>, bytes: &[u8]) -> ReelResult<()> {
        let image = decode_image(bytes)?;
        self.set(name, image);
        Ok(())
    }

    /// Look up an image by name.
    pub fn get(&self, name: &str) -> Option<Arc<RasterImage>> {
        self.inner.borrow().get(name).cloned()
    }

    /// `true` when `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.borrow().contains_key(name)
    }

    /// Remove an image; removing a missing name is a no-op.
    pub fn remove(&self, name: &str) {
        self.inner.borrow_mut().remove(name);
    }

    /// Number of stored images.
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/image_cache.rs"]
mod tests;
