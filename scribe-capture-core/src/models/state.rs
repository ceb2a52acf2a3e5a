/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → active → finalized
/// ```
///
/// `start` is the only idle → active edge; `stop` is the only
/// active → finalized edge. There is no way back out of `finalized`:
/// a session is never reused once it has produced (or failed to produce)
/// its artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Active,
    Finalized,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Terminal: the session has finalized and may not be restarted.
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized)
    }
}
