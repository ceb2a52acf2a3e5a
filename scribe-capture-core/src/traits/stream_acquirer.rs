use crate::models::error::CaptureError;
use crate::models::stream::AudioStream;

/// Interface to the platform's device-media facility.
///
/// Implemented by backends (`scribe-capture-cpal` on desktop) and by
/// fakes in tests, so the coordination logic never touches real hardware.
pub trait StreamAcquirer: Send + Sync {
    /// Request an audio-only input stream.
    ///
    /// May trigger a user-facing permission prompt, which is outside this
    /// crate's control. Fails with [`CaptureError::PermissionDenied`] or
    /// [`CaptureError::DeviceUnavailable`]; on failure no device resource
    /// is held and the caller must not proceed to start a session.
    fn acquire(&self) -> Result<AudioStream, CaptureError>;
}
