//! Wiring between the guest-facing registries and the renderer.

/// Cross-thread batch transport.
pub mod channel;
/// Pause / step / stop gating.
pub mod control;
/// Registry, cache and renderer wired together.
pub mod reel_session;
