use super::error::EngineError;
use crate::storage::ArtifactId;

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// idle → recording ↔ paused
///             ↓         ↓
///           stopped → idle
/// ```
/// Any non-idle state may fall to `failed` on a device or integrity
/// error; only `reset` (→ idle) leaves it.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderState {
    Idle,
    Recording { duration_secs: f64 },
    Paused { duration_secs: f64 },
    Stopped,
    Failed {
        error: EngineError,
        /// Partial capture preserved for recovery, if any audio landed
        /// before the failure.
        partial: Option<ArtifactId>,
    },
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether the session is accepting or holding captured audio.
    pub fn is_active(&self) -> bool {
        self.is_recording() || self.is_paused()
    }

    /// Returns the accumulated duration if the state tracks one.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Recording { duration_secs } | Self::Paused { duration_secs } => {
                Some(*duration_secs)
            }
            _ => None,
        }
    }

    /// Short state name used in transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording { .. } => "recording",
            Self::Paused { .. } => "paused",
            Self::Stopped => "stopped",
            Self::Failed { .. } => "failed",
        }
    }
}
