/// Convenience result type used across parallaxfx.
pub type ParallaxResult<T> = Result<T, ParallaxError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum ParallaxError {
    /// Invalid user-provided data: degenerate images, out-of-range settings.
    #[error("validation error: {0}")]
    Validation(String),

    /// Device, texture, buffer or pipeline acquisition failed. Fatal at construction time.
    #[error("resource error: {0}")]
    Resource(String),

    /// A render pass could not be encoded. Only the current frame is lost.
    #[error("encode error: {0}")]
    Encode(String),

    /// Still or video export failed.
    #[error("export error: {0}")]
    Export(String),

    /// Errors when serializing or deserializing settings.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ParallaxError {
    /// Build a [`ParallaxError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ParallaxError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`ParallaxError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`ParallaxError::Export`] value.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Build a [`ParallaxError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors that only cost the current frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Encode(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
