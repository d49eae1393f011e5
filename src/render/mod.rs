//! Canvas interpreter and its drawing backends.

pub(crate) mod blur;
pub(crate) mod color;
/// Native context and surface traits.
pub mod context;
/// `vello_cpu` backend.
pub mod cpu;
/// Command interpreter.
pub mod renderer;
pub(crate) mod text;
