use serde::{Deserialize, Serialize};

use crate::storage::ArtifactId;

/// Lowest accepted pitch-shift ratio.
pub const MIN_PITCH_RATIO: f64 = 0.5;
/// Highest accepted pitch-shift ratio.
pub const MAX_PITCH_RATIO: f64 = 2.0;

/// One reversible audio edit, recorded in [`crate::history::EditHistory`]
/// and replayed by the transform pipeline.
///
/// Commands are immutable value objects; their serde encoding feeds the
/// render-cache content hash, so field order and names are part of the
/// replay identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditCommand {
    /// Keep only `[start_secs, end_secs)`.
    Trim { start_secs: f64, end_secs: f64 },
    /// Resample by `ratio` in `[MIN_PITCH_RATIO, MAX_PITCH_RATIO]`.
    PitchShift { ratio: f64 },
    /// Apply a named voice-tone profile.
    ToneChange { profile: String },
    /// Parameterless noise gate.
    NoiseReduction,
    /// Mix a second sealed artifact on top at the given gain.
    Mix { source: ArtifactId, gain: f32 },
}

impl EditCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Trim { .. } => "trim",
            Self::PitchShift { .. } => "pitch_shift",
            Self::ToneChange { .. } => "tone_change",
            Self::NoiseReduction => "noise_reduction",
            Self::Mix { .. } => "mix",
        }
    }

    /// Whether applying this command directly after `last` changes nothing.
    ///
    /// Noise reduction is on/off: a second consecutive application is a
    /// detectable no-op and is coalesced away instead of recorded.
    pub fn is_redundant_after(&self, last: Option<&EditCommand>) -> bool {
        matches!(
            (self, last),
            (Self::NoiseReduction, Some(Self::NoiseReduction))
        )
    }
}
