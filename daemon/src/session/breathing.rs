//! Breathing guidance cycle
//!
//! A cyclic phase machine (In -> Hold -> Out -> In ...) advanced once per
//! clock tick. `Idle` is the resting state used whenever guidance is off or
//! no session is in progress.

use serde::{Deserialize, Serialize};

/// One segment of the breathing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathingPhase {
    /// Guidance off / not cycling
    #[default]
    Idle,
    In,
    Hold,
    Out,
}

/// Static configuration of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSpec {
    /// Seconds spent in the phase
    pub duration: u32,
    /// Phase entered once `duration` elapses
    pub next: BreathingPhase,
    /// Spoken cue for the phase
    pub cue: &'static str,
    /// Text shown while the phase is active
    pub label: &'static str,
}

const IN: PhaseSpec = PhaseSpec {
    duration: 4,
    next: BreathingPhase::Hold,
    cue: "Breathe In",
    label: "Breathe In",
};

const HOLD: PhaseSpec = PhaseSpec {
    duration: 4,
    next: BreathingPhase::Out,
    cue: "Hold",
    label: "Hold",
};

const OUT: PhaseSpec = PhaseSpec {
    duration: 6,
    next: BreathingPhase::In,
    cue: "Breathe Out",
    label: "Breathe Out",
};

const IDLE: PhaseSpec = PhaseSpec {
    duration: 0,
    next: BreathingPhase::Idle,
    cue: "",
    label: "",
};

impl BreathingPhase {
    /// Look up the cycle table entry for this phase
    pub fn spec(self) -> &'static PhaseSpec {
        match self {
            BreathingPhase::Idle => &IDLE,
            BreathingPhase::In => &IN,
            BreathingPhase::Hold => &HOLD,
            BreathingPhase::Out => &OUT,
        }
    }
}

impl std::fmt::Display for BreathingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreathingPhase::Idle => write!(f, "Idle"),
            BreathingPhase::In => write!(f, "In"),
            BreathingPhase::Hold => write!(f, "Hold"),
            BreathingPhase::Out => write!(f, "Out"),
        }
    }
}

/// Phase machine for breathing guidance
#[derive(Debug, Clone, Default)]
pub struct BreathingCycle {
    phase: BreathingPhase,
    time_in_phase: u32,
}

impl BreathingCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> BreathingPhase {
        self.phase
    }

    pub fn time_in_phase(&self) -> u32 {
        self.time_in_phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == BreathingPhase::Idle
    }

    /// Advance by one second.
    ///
    /// Returns the newly entered phase when a transition happened. From
    /// `Idle` the cycle enters `In` immediately.
    pub fn advance(&mut self) -> Option<BreathingPhase> {
        if self.is_idle() {
            return Some(self.enter(BreathingPhase::In));
        }

        self.time_in_phase += 1;
        let spec = self.phase.spec();
        if self.time_in_phase >= spec.duration {
            Some(self.enter(spec.next))
        } else {
            None
        }
    }

    /// Snap to the start of the cycle if currently idle.
    ///
    /// A cycle that is already running is left exactly where it was.
    pub fn resume_if_needed(&mut self) -> Option<BreathingPhase> {
        if self.is_idle() {
            Some(self.enter(BreathingPhase::In))
        } else {
            None
        }
    }

    /// Force the resting state. Returns true if a phase was active.
    pub fn enter_idle(&mut self) -> bool {
        let was_active = !self.is_idle();
        self.phase = BreathingPhase::Idle;
        self.time_in_phase = 0;
        was_active
    }

    fn enter(&mut self, phase: BreathingPhase) -> BreathingPhase {
        self.phase = phase;
        self.time_in_phase = 0;
        phase
    }
}
