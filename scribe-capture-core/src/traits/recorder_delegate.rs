use crate::models::artifact::Artifact;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Event delegate for the UI collaborator.
///
/// Methods fire on whichever thread drives the controller, not a UI
/// thread; implementations marshal as needed.
pub trait RecorderDelegate: Send + Sync {
    /// The session state machine took a transition.
    fn on_state_changed(&self, state: &CaptureState);

    /// Recording finalized into an artifact ready for preview/upload.
    fn on_artifact_ready(&self, artifact: &Artifact);

    /// Acquisition or finalize failed; surfaced as a user-visible error.
    fn on_error(&self, error: &CaptureError);
}
