//! Audio dispatch policy
//!
//! A pure function from (event, settings, timer state, ambient playing) to
//! the side effects that should follow. Nothing here touches a backend, so
//! every rule is testable without audio.

use crate::session::{BreathingPhase, Settings, TimerState};

use super::cue::Cue;

/// Transitions the policy reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    SessionStart,
    SessionEnd,
    PhaseChanged(BreathingPhase),
    Pause,
    Resume,
    SoundToggled(bool),
    AmbientToggled(bool),
    GuidanceToggled(bool),
    Reset,
}

/// Requested change to the looping ambient source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientAction {
    Start,
    Stop,
}

/// Requested change to the breathing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathingDirective {
    /// Enter `In` right away if the cycle is idle
    SnapToStart,
    /// Drop to `Idle`
    ForceIdle,
}

/// Everything the policy looks at besides the event itself
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput {
    /// Settings after the triggering change was applied
    pub settings: Settings,
    /// Timer state after the triggering transition
    pub timer: TimerState,
    pub ambient_playing: bool,
}

/// Side effects to carry out, in field order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioPlan {
    pub cancel_speech: bool,
    pub cue: Option<Cue>,
    pub ambient: Option<AmbientAction>,
    pub breathing: Option<BreathingDirective>,
}

/// Decide what follows `event`
pub fn decide(event: AudioEvent, input: &PolicyInput) -> AudioPlan {
    let settings = &input.settings;
    let mut plan = AudioPlan {
        breathing: breathing_directive(event, input),
        ..AudioPlan::default()
    };

    // Sound off wins over every other rule
    if !settings.sound_enabled {
        plan.cancel_speech = true;
        plan.ambient = Some(AmbientAction::Stop);
        return plan;
    }

    match event {
        AudioEvent::SessionStart => {
            plan.cue = Some(Cue::StartChime);
            if settings.ambient_sound_enabled {
                plan.ambient = start_ambient(input);
            }
        }
        AudioEvent::SessionEnd => {
            plan.cancel_speech = true;
            plan.cue = Some(Cue::EndChime);
            plan.ambient = Some(AmbientAction::Stop);
        }
        AudioEvent::PhaseChanged(phase) => {
            if settings.breathing_guidance_enabled
                && phase != BreathingPhase::Idle
                && input.timer == TimerState::Running
            {
                plan.cancel_speech = true;
                plan.cue = Some(Cue::Phase { phase });
            }
        }
        AudioEvent::Pause => {
            plan.ambient = Some(AmbientAction::Stop);
        }
        AudioEvent::Resume => {
            if settings.ambient_sound_enabled {
                plan.ambient = start_ambient(input);
            }
        }
        AudioEvent::AmbientToggled(true) | AudioEvent::SoundToggled(true) => {
            if settings.ambient_sound_enabled && input.timer.is_active() {
                plan.ambient = start_ambient(input);
            }
        }
        AudioEvent::AmbientToggled(false) => {
            plan.ambient = Some(AmbientAction::Stop);
        }
        AudioEvent::SoundToggled(false) => {
            plan.cancel_speech = true;
            plan.ambient = Some(AmbientAction::Stop);
        }
        AudioEvent::GuidanceToggled(enabled) => {
            plan.cancel_speech = !enabled;
        }
        AudioEvent::Reset => {
            plan.cancel_speech = true;
            plan.ambient = Some(AmbientAction::Stop);
        }
    }

    plan
}

/// Breathing changes apply whether or not sound is on
fn breathing_directive(event: AudioEvent, input: &PolicyInput) -> Option<BreathingDirective> {
    let guidance = input.settings.breathing_guidance_enabled;
    match event {
        AudioEvent::SessionStart | AudioEvent::Resume if guidance => {
            Some(BreathingDirective::SnapToStart)
        }
        AudioEvent::GuidanceToggled(true) if input.timer.is_active() => {
            Some(BreathingDirective::SnapToStart)
        }
        AudioEvent::SessionEnd | AudioEvent::Reset | AudioEvent::GuidanceToggled(false) => {
            Some(BreathingDirective::ForceIdle)
        }
        _ => None,
    }
}

/// Starting an already playing source is a no-op
fn start_ambient(input: &PolicyInput) -> Option<AmbientAction> {
    (!input.ambient_playing).then_some(AmbientAction::Start)
}
