//! Session state machine
//!
//! Composes the countdown clock and the breathing cycle with the user
//! settings, and routes every transition through the audio policy.

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::audio::{
    decide, AmbientAction, AudioCollaborator, AudioDispatcher, AudioEvent, BreathingDirective,
    PolicyInput,
};
use crate::events::SessionEvent;

use super::breathing::{BreathingCycle, BreathingPhase};
use super::clock::{
    format_time, DurationError, SessionClock, SessionDuration, StartOutcome, TickOutcome,
    TimerState,
};
use super::settings::Settings;
use super::snapshot::SessionSnapshot;

/// Errors surfaced to callers of the session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidDuration(#[from] DurationError),

    #[error("session loop is not running")]
    Unavailable,
}

/// The single meditation session owned by the daemon
pub struct Session {
    clock: SessionClock,
    breathing: BreathingCycle,
    settings: Settings,
    audio: AudioDispatcher,
    /// Channel for emitting session events
    event_tx: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(
        settings: Settings,
        duration: SessionDuration,
        audio: Box<dyn AudioCollaborator>,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            clock: SessionClock::new(duration),
            breathing: BreathingCycle::new(),
            settings,
            audio: AudioDispatcher::new(audio),
            event_tx,
        }
    }

    pub fn timer_state(&self) -> TimerState {
        self.clock.state()
    }

    pub fn time_left(&self) -> u32 {
        self.clock.time_left()
    }

    pub fn phase(&self) -> BreathingPhase {
        self.breathing.phase()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Label for the active phase, empty unless guidance is visible
    pub fn current_phase_text(&self) -> &'static str {
        if self.settings.breathing_guidance_enabled
            && !self.breathing.is_idle()
            && self.clock.state().is_active()
        {
            self.breathing.phase().spec().label
        } else {
            ""
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let time_left = self.clock.time_left();
        let duration = self.clock.duration().secs();
        let state = self.clock.state();
        SessionSnapshot {
            timer_state: state,
            duration_secs: duration,
            time_left_secs: time_left,
            time_left_display: format_time(time_left),
            phase: self.breathing.phase(),
            time_in_phase_secs: self.breathing.time_in_phase(),
            phase_text: self.current_phase_text().to_string(),
            settings: self.settings,
            ambient_playing: self.audio.ambient_playing(),
            can_reset: !(state == TimerState::Idle && time_left == duration),
        }
    }

    /// The single start/pause entry point used by clients
    pub fn start_pause(&mut self) {
        if self.clock.state() == TimerState::Running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Start a fresh countdown, or resume a paused one
    pub fn start(&mut self) {
        let old_state = self.clock.state();
        match self.clock.start() {
            StartOutcome::Ignored => {
                debug!("start requested while running, ignoring");
            }
            StartOutcome::Started => {
                self.log_transition(old_state);
                self.emit(SessionEvent::SessionStarted {
                    duration_secs: self.clock.duration().secs(),
                });
                self.dispatch(AudioEvent::SessionStart);
            }
            StartOutcome::Resumed => {
                self.log_transition(old_state);
                self.emit(SessionEvent::SessionResumed {
                    time_left_secs: self.clock.time_left(),
                });
                self.dispatch(AudioEvent::Resume);
            }
        }
    }

    /// Freeze the countdown; the breathing phase is kept as is
    pub fn pause(&mut self) {
        let old_state = self.clock.state();
        if !self.clock.pause() {
            debug!(state = %old_state, "pause requested while not running, ignoring");
            return;
        }
        self.log_transition(old_state);
        self.emit(SessionEvent::SessionPaused {
            time_left_secs: self.clock.time_left(),
        });
        self.dispatch(AudioEvent::Pause);
    }

    /// Back to idle from any state
    pub fn reset(&mut self) {
        let old_state = self.clock.state();
        self.clock.reset();
        self.log_transition(old_state);
        self.emit(SessionEvent::SessionReset {
            time_left_secs: self.clock.time_left(),
        });
        self.dispatch(AudioEvent::Reset);
    }

    /// Advance one second. Outside `Running` this does nothing.
    pub fn tick(&mut self) {
        match self.clock.tick() {
            TickOutcome::Ignored => {
                debug!(state = %self.clock.state(), "tick outside running state, ignoring");
            }
            TickOutcome::Counted { time_left } => {
                self.emit(SessionEvent::Tick {
                    time_left_secs: time_left,
                });
                if self.settings.breathing_guidance_enabled {
                    if let Some(phase) = self.breathing.advance() {
                        self.phase_entered(phase);
                    }
                }
            }
            TickOutcome::Finished => {
                self.log_transition(TimerState::Running);
                self.emit(SessionEvent::Tick { time_left_secs: 0 });
                self.emit(SessionEvent::SessionFinished);
                self.dispatch(AudioEvent::SessionEnd);
            }
        }
    }

    /// Select a new session length. Invalid values keep the old one.
    pub fn set_duration(&mut self, secs: u32) -> Result<SessionDuration, SessionError> {
        let duration = SessionDuration::try_from(secs)?;
        self.clock.set_duration(duration);
        info!(
            duration_secs = duration.secs(),
            time_left_secs = self.clock.time_left(),
            "duration changed"
        );
        self.emit(SessionEvent::DurationChanged {
            duration_secs: duration.secs(),
            time_left_secs: self.clock.time_left(),
        });
        Ok(duration)
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        if self.settings.sound_enabled == enabled {
            return;
        }
        self.settings.sound_enabled = enabled;
        self.settings_changed("sound", enabled);
        self.dispatch(AudioEvent::SoundToggled(enabled));
    }

    pub fn set_breathing_guidance(&mut self, enabled: bool) {
        if self.settings.breathing_guidance_enabled == enabled {
            return;
        }
        self.settings.breathing_guidance_enabled = enabled;
        self.settings_changed("breathing_guidance", enabled);
        self.dispatch(AudioEvent::GuidanceToggled(enabled));
    }

    pub fn set_ambient_sound(&mut self, enabled: bool) {
        if self.settings.ambient_sound_enabled == enabled {
            return;
        }
        self.settings.ambient_sound_enabled = enabled;
        self.settings_changed("ambient_sound", enabled);
        self.dispatch(AudioEvent::AmbientToggled(enabled));
    }

    /// Release audio resources when the daemon exits
    pub fn teardown(&mut self) {
        self.audio.cancel_speech();
        self.audio.stop_ambient();
        info!(state = %self.clock.state(), "session torn down");
    }

    /// Run the audio policy for `event` and carry out the plan
    fn dispatch(&mut self, event: AudioEvent) {
        let input = PolicyInput {
            settings: self.settings,
            timer: self.clock.state(),
            ambient_playing: self.audio.ambient_playing(),
        };
        let plan = decide(event, &input);
        debug!(?event, ?plan, "audio plan");

        if plan.cancel_speech {
            self.audio.cancel_speech();
        }
        if let Some(cue) = plan.cue {
            self.audio.play_cue(cue);
        }
        match plan.ambient {
            Some(AmbientAction::Start) => self.audio.start_ambient(),
            Some(AmbientAction::Stop) => self.audio.stop_ambient(),
            None => {}
        }
        match plan.breathing {
            Some(BreathingDirective::SnapToStart) => {
                if let Some(phase) = self.breathing.resume_if_needed() {
                    self.phase_entered(phase);
                }
            }
            Some(BreathingDirective::ForceIdle) => {
                if self.breathing.enter_idle() {
                    self.emit_phase(BreathingPhase::Idle);
                }
            }
            None => {}
        }
    }

    fn phase_entered(&mut self, phase: BreathingPhase) {
        debug!(%phase, "breathing phase entered");
        self.emit_phase(phase);
        self.dispatch(AudioEvent::PhaseChanged(phase));
    }

    fn emit_phase(&self, phase: BreathingPhase) {
        self.emit(SessionEvent::PhaseChanged {
            phase,
            text: self.current_phase_text().to_string(),
        });
    }

    fn settings_changed(&self, setting: &'static str, enabled: bool) {
        info!(setting, enabled, "setting changed");
        self.emit(SessionEvent::SettingsChanged {
            settings: self.settings,
        });
    }

    fn log_transition(&self, old_state: TimerState) {
        info!(
            from = %old_state,
            to = %self.clock.state(),
            time_left_secs = self.clock.time_left(),
            "state transition"
        );
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers just means nobody is listening right now
        let _ = self.event_tx.send(event);
    }
}
