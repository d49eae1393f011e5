use std::cell::RefCell;
use std::rc::Rc;

use crate::assets::image_cache::ImageCache;
use crate::foundation::error::ReelResult;
use crate::paths::registry::PathRegistry;
use crate::protocol::batch::CommandQueue;
use crate::protocol::command::DrawCommand;
use crate::render::context::{Context2d, Surface};
use crate::render::renderer::{Renderer, RendererOpts};
use crate::session::channel::BatchReceiver;
use crate::session::control::{FrameGrant, PlaybackControl};

/// Options for [`Session::new`].
#[derive(Clone, Debug, Default)]
pub struct SessionOpts {
    pub(crate) renderer: RendererOpts,
}

impl SessionOpts {
    /// Options handed to the session's renderer.
    pub fn with_renderer(mut self, renderer: RendererOpts) -> Self {
        self.renderer = renderer;
        self
    }
}

/// One guest's drawing session: registries, command queue, playback gate and renderer.
///
/// Path registry render calls and guest commands share one [`CommandQueue`]; every admitted frame
/// drains it into a single batch.
pub struct Session<C: Context2d> {
    images: ImageCache,
    paths: Rc<RefCell<PathRegistry>>,
    queue: CommandQueue,
    control: PlaybackControl,
    renderer: Option<Renderer<C>>,
}

impl<C: Context2d> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("images", &self.images.len())
            .field("queued", &self.queue.len())
            .field("mode", &self.control.mode())
            .field("stopped", &self.renderer.is_none())
            .finish()
    }
}

impl<C: Context2d + 'static> Session<C> {
    /// Acquire a context from `surface` and wire the registry's sink, hit tester and lookup.
    pub fn new<S>(surface: &mut S, opts: SessionOpts) -> ReelResult<Self>
    where
        S: Surface<Context = C>,
    {
        let images = ImageCache::new();
        let mut renderer = Renderer::with_opts(surface, Some(images.clone()), opts.renderer)?;
        let queue = CommandQueue::new();

        let mut registry = PathRegistry::new();
        registry.set_command_sink(Some(queue.sink()));
        registry.set_hit_tester(Some(renderer.hit_tester()));
        let paths = Rc::new(RefCell::new(registry));
        renderer.set_paths(Some(Rc::clone(&paths)));

        Ok(Self {
            images,
            paths,
            queue,
            control: PlaybackControl::new(),
            renderer: Some(renderer),
        })
    }
}

impl<C: Context2d> Session<C> {
    /// Image cache shared with the renderer.
    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    /// The guest-facing path registry.
    pub fn paths(&self) -> &Rc<RefCell<PathRegistry>> {
        &self.paths
    }

    /// Queue for the frame being produced.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Playback gate; clone it to hand to producers on other threads.
    pub fn control(&self) -> &PlaybackControl {
        &self.control
    }

    /// Live renderer, for synchronous hit tests and pixel access. `None` after [`Session::stop`].
    pub fn renderer(&self) -> Option<&Renderer<C>> {
        self.renderer.as_ref()
    }

    /// `true` once the session has been torn down.
    pub fn is_stopped(&self) -> bool {
        self.renderer.is_none()
    }

    /// Produce and render one frame if playback admits it.
    ///
    /// `produce` fills the queue, directly or through registry render calls. Returns `false`
    /// without calling it when the frame is held or the session is stopped.
    pub fn frame(&mut self, produce: impl FnOnce(&CommandQueue, &mut PathRegistry)) -> bool {
        if !self.admit() {
            return false;
        }
        match self.paths.try_borrow_mut() {
            Ok(mut paths) => produce(&self.queue, &mut paths),
            Err(_) => {
                tracing::warn!("path registry busy; skipping frame producer");
                return false;
            }
        }
        let batch = self.queue.take_batch();
        self.render(&batch);
        true
    }

    /// Render an externally produced batch if playback admits it.
    #[tracing::instrument(skip_all, fields(len = batch.len()))]
    pub fn submit(&mut self, batch: &[DrawCommand]) -> bool {
        if !self.admit() {
            return false;
        }
        self.render(batch);
        true
    }

    /// Render every batch pending on `rx`, in order. Returns how many were rendered.
    ///
    /// Gating is the producer's job here, through [`PlaybackControl::wait_frame`].
    pub fn pump(&mut self, rx: &BatchReceiver) -> usize {
        if self.renderer.is_none() {
            return 0;
        }
        let mut rendered = 0;
        while let Some(batch) = rx.try_next() {
            self.render(&batch);
            rendered += 1;
        }
        rendered
    }

    /// Tear down: stop playback, drop the renderer and its context, clear the registry.
    pub fn stop(&mut self) {
        self.control.stop();
        if self.renderer.take().is_some() {
            tracing::debug!("session stopped");
        }
        self.queue.take_batch();
        match self.paths.try_borrow_mut() {
            Ok(mut paths) => paths.clear(),
            Err(_) => tracing::warn!("path registry busy; not cleared on stop"),
        }
    }

    fn admit(&mut self) -> bool {
        if self.renderer.is_none() {
            return false;
        }
        match self.control.try_acquire_frame() {
            FrameGrant::Frame => true,
            FrameGrant::Hold => false,
            FrameGrant::Stop => {
                self.stop();
                false
            }
        }
    }

    fn render(&mut self, batch: &[DrawCommand]) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(batch);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/reel_session.rs"]
mod tests;
