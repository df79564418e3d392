use crate::models::error::EngineError;
use crate::models::outcome::CaptureOutcome;
use crate::models::state::RecorderState;

/// Event delegate for recording session notifications.
///
/// Methods are called from whichever thread observed the event (caller
/// thread for transitions, writer/watchdog threads for failures).
/// Implementations should marshal to the UI thread if needed.
pub trait RecorderDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &RecorderState);

    /// Called when a capture error fails the session.
    fn on_error(&self, error: &EngineError);

    /// Called when capture stops and the raw artifact is sealed.
    fn on_capture_finished(&self, outcome: &CaptureOutcome);
}
