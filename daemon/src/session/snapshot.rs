//! Read model handed to the presentation layer

use serde::{Deserialize, Serialize};

use super::{BreathingPhase, SessionDuration, Settings, TimerState};

/// Everything a client needs to draw the timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub timer_state: TimerState,
    pub duration_secs: u32,
    pub time_left_secs: u32,
    /// `MM:SS` rendering of `time_left_secs`
    pub time_left_display: String,
    pub phase: BreathingPhase,
    pub time_in_phase_secs: u32,
    /// Empty unless guidance is on and a session is in progress
    pub phase_text: String,
    pub settings: Settings,
    pub ambient_playing: bool,
    /// False only when idle with the full duration remaining
    pub can_reset: bool,
}

/// A selectable session length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationOption {
    pub label: String,
    pub seconds: u32,
}

impl From<SessionDuration> for DurationOption {
    fn from(duration: SessionDuration) -> Self {
        Self {
            label: duration.label().to_string(),
            seconds: duration.secs(),
        }
    }
}

impl DurationOption {
    pub fn all() -> Vec<DurationOption> {
        SessionDuration::all().map(Into::into).collect()
    }
}
