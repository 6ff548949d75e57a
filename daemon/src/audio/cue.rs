//! Audio cue identifiers

use serde::{Deserialize, Serialize};

use crate::session::BreathingPhase;

/// Tone played when a session starts
pub const START_CHIME_ID: &str = "CHIME_START";
/// Tone played when the countdown reaches zero
pub const END_CHIME_ID: &str = "CHIME_END";

/// A discrete sound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cue {
    StartChime,
    EndChime,
    /// Spoken label for a breathing phase
    Phase { phase: BreathingPhase },
}

impl Cue {
    /// Identifier handed to the audio backend. Chimes use fixed ids, phase
    /// cues use the text to be spoken.
    pub fn id(&self) -> &'static str {
        match self {
            Cue::StartChime => START_CHIME_ID,
            Cue::EndChime => END_CHIME_ID,
            Cue::Phase { phase } => phase.spec().cue,
        }
    }

    /// Spoken cues go through the cancellable speech channel
    pub fn is_spoken(&self) -> bool {
        matches!(self, Cue::Phase { .. })
    }
}

impl std::fmt::Display for Cue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
