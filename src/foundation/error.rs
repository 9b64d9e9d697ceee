/// Convenience result type used across wyr.
pub type WyrResult<T> = Result<T, WyrError>;

/// Top-level error taxonomy used by pipeline and job APIs.
#[derive(thiserror::Error, Debug)]
pub enum WyrError {
    /// Invalid user-provided request or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// An option image could not be decoded or has zero area.
    #[error("image decode error: {0}")]
    Decode(String),

    /// Narration synthesis failed.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// A deadline or per-call time box was exceeded.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The codec library failed to encode or mux.
    #[error("encode error: {0}")]
    Encode(String),

    /// Frame composition failed.
    #[error("render error: {0}")]
    Render(String),

    /// The job was cancelled before completion.
    #[error("job cancelled")]
    Cancelled,

    /// The orchestrator refused new work (backlog full or shutting down).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse failure category reported through job status polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Bad request or configuration.
    Validation,
    /// Undecodable image.
    Decode,
    /// Narration failure (only surfaced when narration was required).
    Synthesis,
    /// Deadline or per-call timeout.
    Timeout,
    /// Codec failure.
    Encode,
    /// Compositor failure.
    Render,
    /// Cancelled by the caller.
    Cancelled,
    /// Refused by backpressure.
    Rejected,
    /// Anything else (IO, serialization).
    Internal,
}

impl WyrError {
    /// Build a [`WyrError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`WyrError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`WyrError::Synthesis`] value.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    /// Build a [`WyrError::Timeout`] value.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Build a [`WyrError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`WyrError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`WyrError::Rejected`] value.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Build a [`WyrError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Synthesis(_) => ErrorKind::Synthesis,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Render(_) => ErrorKind::Render,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Rejected(_) => ErrorKind::Rejected,
            Self::Serde(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
