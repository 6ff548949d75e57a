//! Session clock: the second-granularity countdown
//!
//! Owns the selected duration, the remaining time and the timer state.
//! Audio and breathing side effects are decided elsewhere; the clock only
//! reports which transition happened.

use serde::{Deserialize, Serialize};

/// Allowed session lengths in seconds, paired with their display labels
pub const DURATION_OPTIONS: [(u32, &str); 6] = [
    (60, "1 min"),
    (180, "3 min"),
    (300, "5 min"),
    (600, "10 min"),
    (900, "15 min"),
    (1200, "20 min"),
];

/// Duration used when nothing else is configured
pub const DEFAULT_DURATION_SECS: u32 = 300;

/// The four states of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Not started, full duration remaining
    #[default]
    Idle,
    /// Counting down
    Running,
    /// Countdown frozen, resumable
    Paused,
    /// Reached zero
    Finished,
}

impl TimerState {
    /// Running or paused, i.e. a session is in progress
    pub fn is_active(self) -> bool {
        matches!(self, TimerState::Running | TimerState::Paused)
    }
}

impl std::fmt::Display for TimerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerState::Idle => write!(f, "Idle"),
            TimerState::Running => write!(f, "Running"),
            TimerState::Paused => write!(f, "Paused"),
            TimerState::Finished => write!(f, "Finished"),
        }
    }
}

/// Rejected duration values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("{0}s is not a supported session length (expected one of 60, 180, 300, 600, 900, 1200)")]
    NotAllowed(u32),
}

/// A session length drawn from [`DURATION_OPTIONS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SessionDuration(u32);

impl SessionDuration {
    pub fn secs(self) -> u32 {
        self.0
    }

    /// Human readable label, e.g. "5 min"
    pub fn label(self) -> &'static str {
        DURATION_OPTIONS
            .iter()
            .find(|(secs, _)| *secs == self.0)
            .map(|(_, label)| *label)
            .unwrap_or_default()
    }

    /// Every allowed duration in ascending order
    pub fn all() -> impl Iterator<Item = SessionDuration> {
        DURATION_OPTIONS.iter().map(|(secs, _)| SessionDuration(*secs))
    }
}

impl Default for SessionDuration {
    fn default() -> Self {
        Self(DEFAULT_DURATION_SECS)
    }
}

impl TryFrom<u32> for SessionDuration {
    type Error = DurationError;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        if DURATION_OPTIONS.iter().any(|(allowed, _)| *allowed == secs) {
            Ok(Self(secs))
        } else {
            Err(DurationError::NotAllowed(secs))
        }
    }
}

impl From<SessionDuration> for u32 {
    fn from(duration: SessionDuration) -> Self {
        duration.0
    }
}

/// What a call to [`SessionClock::start`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Fresh countdown from the full duration
    Started,
    /// Continued a paused countdown
    Resumed,
    /// Already running, nothing changed
    Ignored,
}

/// What a call to [`SessionClock::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; the tick was dropped
    Ignored,
    /// One second elapsed
    Counted { time_left: u32 },
    /// The countdown reached zero
    Finished,
}

/// The countdown state machine
#[derive(Debug, Clone)]
pub struct SessionClock {
    duration: SessionDuration,
    time_left: u32,
    state: TimerState,
}

impl SessionClock {
    pub fn new(duration: SessionDuration) -> Self {
        Self {
            duration,
            time_left: duration.secs(),
            state: TimerState::Idle,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn duration(&self) -> SessionDuration {
        self.duration
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    /// Start a fresh countdown or continue a paused one
    pub fn start(&mut self) -> StartOutcome {
        match self.state {
            TimerState::Running => StartOutcome::Ignored,
            TimerState::Paused => {
                self.state = TimerState::Running;
                StartOutcome::Resumed
            }
            TimerState::Idle | TimerState::Finished => {
                self.time_left = self.duration.secs();
                self.state = TimerState::Running;
                StartOutcome::Started
            }
        }
    }

    /// Freeze the countdown. Returns false unless the clock was running.
    pub fn pause(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.state = TimerState::Paused;
        true
    }

    /// Back to idle with the full (possibly updated) duration
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.time_left = self.duration.secs();
    }

    /// Advance one second
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != TimerState::Running {
            return TickOutcome::Ignored;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.state = TimerState::Finished;
            TickOutcome::Finished
        } else {
            TickOutcome::Counted {
                time_left: self.time_left,
            }
        }
    }

    /// Select a new duration. A countdown in progress keeps its length.
    pub fn set_duration(&mut self, duration: SessionDuration) {
        self.duration = duration;
        if matches!(self.state, TimerState::Idle | TimerState::Finished) {
            self.time_left = duration.secs();
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new(SessionDuration::default())
    }
}

/// Format seconds as `MM:SS`
pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(secs: u32) -> SessionClock {
        SessionClock::new(SessionDuration::try_from(secs).unwrap())
    }

    #[test]
    fn test_set_duration_while_idle() {
        for duration in SessionDuration::all() {
            let mut clock = SessionClock::default();
            clock.set_duration(duration);
            assert_eq!(clock.time_left(), duration.secs());
            assert_eq!(clock.state(), TimerState::Idle);
        }
    }

    #[test]
    fn test_invalid_duration_rejected() {
        assert_eq!(
            SessionDuration::try_from(45),
            Err(DurationError::NotAllowed(45))
        );
        assert!(SessionDuration::try_from(0).is_err());
        assert_eq!(SessionDuration::try_from(600).unwrap().label(), "10 min");
    }

    #[test]
    fn test_countdown_finishes_and_clamps() {
        let mut clock = clock(60);
        assert_eq!(clock.start(), StartOutcome::Started);

        for _ in 0..59 {
            assert!(matches!(clock.tick(), TickOutcome::Counted { .. }));
        }
        assert_eq!(clock.tick(), TickOutcome::Finished);
        assert_eq!(clock.state(), TimerState::Finished);
        assert_eq!(clock.time_left(), 0);

        assert_eq!(clock.tick(), TickOutcome::Ignored);
        assert_eq!(clock.time_left(), 0);
    }

    #[test]
    fn test_start_while_running_is_ignored() {
        let mut clock = clock(60);
        clock.start();
        clock.tick();
        assert_eq!(clock.start(), StartOutcome::Ignored);
        assert_eq!(clock.time_left(), 59);
    }

    #[test]
    fn test_pause_and_resume_keep_time_left() {
        let mut clock = clock(180);
        clock.start();
        clock.tick();
        clock.tick();
        assert!(clock.pause());
        assert_eq!(clock.tick(), TickOutcome::Ignored);
        assert_eq!(clock.time_left(), 178);

        assert_eq!(clock.start(), StartOutcome::Resumed);
        assert_eq!(clock.time_left(), 178);
    }

    #[test]
    fn test_pause_only_from_running() {
        let mut clock = clock(60);
        assert!(!clock.pause());
        assert_eq!(clock.state(), TimerState::Idle);
    }

    #[test]
    fn test_duration_change_mid_session_applies_on_reset() {
        let mut clock = clock(300);
        clock.start();
        clock.tick();
        clock.set_duration(SessionDuration::try_from(60).unwrap());
        assert_eq!(clock.time_left(), 299);

        clock.reset();
        assert_eq!(clock.state(), TimerState::Idle);
        assert_eq!(clock.time_left(), 60);
    }

    #[test]
    fn test_restart_after_finish_resets_time() {
        let mut clock = clock(60);
        clock.start();
        while clock.tick() != TickOutcome::Finished {}
        assert_eq!(clock.start(), StartOutcome::Started);
        assert_eq!(clock.time_left(), 60);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(300), "05:00");
        assert_eq!(format_time(61), "01:01");
        assert_eq!(format_time(0), "00:00");
    }
}
