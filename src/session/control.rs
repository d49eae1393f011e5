use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Playback mode of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Every frame is admitted.
    Playing,
    /// Frames are admitted only through [`PlaybackControl::step`].
    Paused,
    /// Terminal; nothing is admitted again.
    Stopped,
}

/// Outcome of asking for permission to produce a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameGrant {
    /// Produce and render one frame.
    Frame,
    /// Paused with no pending step; try again later.
    Hold,
    /// The session has stopped.
    Stop,
}

#[derive(Debug)]
struct ControlState {
    mode: PlaybackMode,
    pending_step: bool,
}

/// Thread-safe pause / step / stop gate shared between a session and its producers.
///
/// Clones share the same state.
#[derive(Clone, Debug)]
pub struct PlaybackControl {
    shared: Arc<(Mutex<ControlState>, Condvar)>,
}

impl Default for PlaybackControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackControl {
    /// New control in [`PlaybackMode::Playing`].
    pub fn new() -> Self {
        Self {
            shared: Arc::new((
                Mutex::new(ControlState {
                    mode: PlaybackMode::Playing,
                    pending_step: false,
                }),
                Condvar::new(),
            )),
        }
    }

    /// Current mode.
    pub fn mode(&self) -> PlaybackMode {
        self.lock().mode
    }

    /// Resume free-running playback. Ignored once stopped.
    pub fn play(&self) {
        self.update(|s| {
            if s.mode != PlaybackMode::Stopped {
                s.mode = PlaybackMode::Playing;
                s.pending_step = false;
            }
        });
    }

    /// Pause playback. Ignored once stopped.
    pub fn pause(&self) {
        self.update(|s| {
            if s.mode == PlaybackMode::Playing {
                s.mode = PlaybackMode::Paused;
                s.pending_step = false;
            }
        });
    }

    /// Admit exactly one frame while paused. Steps do not accumulate.
    pub fn step(&self) {
        self.update(|s| {
            if s.mode == PlaybackMode::Paused {
                s.pending_step = true;
            }
        });
    }

    /// Stop for good and wake every waiting producer.
    pub fn stop(&self) {
        self.update(|s| {
            s.mode = PlaybackMode::Stopped;
            s.pending_step = false;
        });
    }

    /// Non-blocking gate check. Consumes a pending step when it grants a paused frame.
    pub fn try_acquire_frame(&self) -> FrameGrant {
        let mut state = self.lock();
        grant(&mut state)
    }

    /// Block until a frame is admitted or the control stops. Never returns [`FrameGrant::Hold`].
    pub fn wait_frame(&self) -> FrameGrant {
        let (_, cvar) = &*self.shared;
        let mut state = self.lock();
        loop {
            match grant(&mut state) {
                FrameGrant::Hold => {
                    state = match cvar.wait(state) {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                }
                decided => return decided,
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut ControlState)) {
        let (_, cvar) = &*self.shared;
        {
            let mut state = self.lock();
            f(&mut state);
            tracing::debug!(mode = ?state.mode, step = state.pending_step, "playback control");
        }
        cvar.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        let (lock, _) = &*self.shared;
        // Every update leaves the state valid, so a poisoned lock is still usable.
        lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn grant(state: &mut ControlState) -> FrameGrant {
    match state.mode {
        PlaybackMode::Playing => FrameGrant::Frame,
        PlaybackMode::Stopped => FrameGrant::Stop,
        PlaybackMode::Paused if state.pending_step => {
            state.pending_step = false;
            FrameGrant::Frame
        }
        PlaybackMode::Paused => FrameGrant::Hold,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/control.rs"]
mod tests;
