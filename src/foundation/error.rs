/// Convenience result type used across maskline.
pub type MasklineResult<T> = Result<T, MasklineError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum MasklineError {
    /// Invalid caller-provided data (geometry, job kind, parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown region, job, or missing event targeted by an operation.
    #[error("not found: {0}")]
    NotFound(String),

    /// Failure reported by an external collaborator (tracker, extractor, encoder).
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Persistence failure; the in-memory state is retained and the save is retried.
    #[error("transient io error: {0}")]
    TransientIo(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// A background job observed its cancellation flag at a checkpoint.
    #[error("cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MasklineError {
    /// Build a [`MasklineError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MasklineError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`MasklineError::ExternalService`] value.
    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    /// Build a [`MasklineError::TransientIo`] value.
    pub fn transient_io(msg: impl Into<String>) -> Self {
        Self::TransientIo(msg.into())
    }

    /// Build a [`MasklineError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for [`MasklineError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
