//! User-toggleable audio settings

use serde::{Deserialize, Serialize};

/// Three independent switches. Turning sound off silences everything but
/// leaves the other two values untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Master switch for all audio
    pub sound_enabled: bool,
    /// Spoken in/hold/out guidance and the phase text
    pub breathing_guidance_enabled: bool,
    /// Looping background noise while a session runs
    pub ambient_sound_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            breathing_guidance_enabled: true,
            ambient_sound_enabled: false,
        }
    }
}
