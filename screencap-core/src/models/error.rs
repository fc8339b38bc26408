use thiserror::Error;

/// Errors that can occur during a capture session.
///
/// Audio acquisition failures never appear here; they are absorbed by the
/// mix bus and only reduce the number of connected inputs. Everything in
/// this enum is pipeline-breaking.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("capture source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("capture source never reported valid dimensions")]
    SourceNotReady,

    #[error("a capture session is already active")]
    SessionActive,

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),
}
