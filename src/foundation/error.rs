/// Convenience result type used across canvasreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Error taxonomy for the few fallible entry points.
///
/// Everything on the replay path is total; only construction, asset loading and textual decoding
/// can fail.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// The drawing surface could not produce a 2D context.
    #[error("context error: {0}")]
    Context(String),

    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Image or font bytes could not be decoded.
    #[error("asset error: {0}")]
    Asset(String),

    /// Errors when serializing or deserializing protocol data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Context`] value.
    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context(msg.into())
    }

    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
