use thiserror::Error;

/// Errors that can occur while acquiring, recording, or visualizing a
/// dictation stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user (or platform policy) refused microphone access.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// No usable audio input device exists, or the device vanished.
    #[error("audio input device unavailable")]
    DeviceUnavailable,

    /// `start` was called on a session that is not idle.
    ///
    /// Indicates a controller bug, not a runtime condition.
    #[error("capture session already active")]
    AlreadyActive,

    /// `stop` was called on a session that was never started, or a second
    /// time on the same session.
    #[error("capture session not active")]
    NotActive,

    /// The encoder failed to produce or flush the recording.
    ///
    /// Device tracks are still released when this is returned from the
    /// stop path.
    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    /// An amplitude probe ran against an analyzer that was already
    /// detached. The render loop must be cancelled before the analyzer is
    /// torn down; hitting this means the shutdown ordering was violated.
    #[error("analyzer graph already torn down")]
    RenderGraphTornDown,

    /// Writing or removing the playable preview file failed.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Backend-specific failure that maps to nothing above.
    #[error("unknown error: {0}")]
    Unknown(String),
}
