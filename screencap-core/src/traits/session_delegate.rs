use crate::models::error::CaptureError;
use crate::models::outcome::SessionOutcome;
use crate::models::state::SessionState;

/// Event delegate for session notifications.
///
/// All methods are called from the session's control or pipeline thread,
/// not the UI thread. Implementations should marshal to the UI thread if
/// needed.
pub trait SessionDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &SessionState);

    /// Called when a pipeline-breaking error occurs.
    fn on_error(&self, error: &CaptureError);

    /// Called when a session reaches a terminal outcome.
    fn on_session_finished(&self, outcome: &SessionOutcome);
}
