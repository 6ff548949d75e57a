//! Audio collaborator contract and dispatcher
//!
//! The collaborator produces sound; the dispatcher sits between it and the
//! session, tracks the single ambient source and swallows every failure so
//! audio problems degrade to silence.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::SessionEvent;

use super::cue::Cue;

/// Errors reported by an audio backend
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error("audio request failed: {0}")]
    Failed(String),
}

/// Something that can turn cue requests into sound.
///
/// Calls are fire-and-forget and must not block.
pub trait AudioCollaborator: Send {
    /// Play a chime or speak a phase label
    fn play_cue(&self, cue: Cue) -> Result<(), AudioError>;

    /// Stop any in-flight spoken cue. Idempotent.
    fn cancel_speech(&self) -> Result<(), AudioError>;

    /// Start the looping background source
    fn start_ambient(&self) -> Result<(), AudioError>;

    /// Stop the looping background source. Safe when nothing plays.
    fn stop_ambient(&self) -> Result<(), AudioError>;
}

/// Audio request as published on the event bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AudioCommand {
    PlayCue { cue: Cue },
    CancelSpeech,
    StartAmbient,
    StopAmbient,
}

/// Publishes audio requests to subscribed clients, which do the synthesis
pub struct BroadcastAudio {
    event_tx: broadcast::Sender<SessionEvent>,
}

impl BroadcastAudio {
    pub fn new(event_tx: broadcast::Sender<SessionEvent>) -> Self {
        Self { event_tx }
    }

    fn publish(&self, command: AudioCommand) -> Result<(), AudioError> {
        self.event_tx
            .send(SessionEvent::Audio { command })
            .map(|_| ())
            .map_err(|_| AudioError::Unavailable("no audio subscribers".to_string()))
    }
}

impl AudioCollaborator for BroadcastAudio {
    fn play_cue(&self, cue: Cue) -> Result<(), AudioError> {
        self.publish(AudioCommand::PlayCue { cue })
    }

    fn cancel_speech(&self) -> Result<(), AudioError> {
        self.publish(AudioCommand::CancelSpeech)
    }

    fn start_ambient(&self) -> Result<(), AudioError> {
        self.publish(AudioCommand::StartAmbient)
    }

    fn stop_ambient(&self) -> Result<(), AudioError> {
        self.publish(AudioCommand::StopAmbient)
    }
}

/// Owns the backend and the "is ambient playing" bit
pub struct AudioDispatcher {
    backend: Box<dyn AudioCollaborator>,
    ambient_playing: bool,
}

impl AudioDispatcher {
    pub fn new(backend: Box<dyn AudioCollaborator>) -> Self {
        Self {
            backend,
            ambient_playing: false,
        }
    }

    pub fn ambient_playing(&self) -> bool {
        self.ambient_playing
    }

    pub fn play_cue(&self, cue: Cue) {
        debug!(%cue, spoken = cue.is_spoken(), "playing cue");
        report("play_cue", self.backend.play_cue(cue));
    }

    pub fn cancel_speech(&self) {
        report("cancel_speech", self.backend.cancel_speech());
    }

    /// Start ambient unless it already plays. A failed start leaves the
    /// source marked as stopped.
    pub fn start_ambient(&mut self) {
        if self.ambient_playing {
            return;
        }
        self.ambient_playing = report("start_ambient", self.backend.start_ambient());
    }

    pub fn stop_ambient(&mut self) {
        report("stop_ambient", self.backend.stop_ambient());
        self.ambient_playing = false;
    }
}

/// Log a backend failure and carry on. Returns whether the call succeeded.
fn report(op: &'static str, result: Result<(), AudioError>) -> bool {
    match result {
        Ok(()) => true,
        Err(AudioError::Unavailable(reason)) => {
            debug!(op, %reason, "audio unavailable, staying silent");
            false
        }
        Err(e) => {
            warn!(op, error = %e, "audio request failed");
            false
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{AudioCall, FailingAudio, RecordingAudio};
    use super::*;
    use crate::session::BreathingPhase;

    #[test]
    fn test_start_ambient_is_idempotent() {
        let backend = RecordingAudio::new();
        let mut dispatcher = AudioDispatcher::new(Box::new(backend.clone()));

        dispatcher.start_ambient();
        dispatcher.start_ambient();
        assert!(dispatcher.ambient_playing());
        assert_eq!(backend.calls(), vec![AudioCall::StartAmbient]);
    }

    #[test]
    fn test_stop_ambient_always_reaches_backend() {
        let backend = RecordingAudio::new();
        let mut dispatcher = AudioDispatcher::new(Box::new(backend.clone()));

        dispatcher.stop_ambient();
        dispatcher.start_ambient();
        dispatcher.stop_ambient();
        assert!(!dispatcher.ambient_playing());
        assert_eq!(
            backend.calls(),
            vec![AudioCall::StopAmbient, AudioCall::StartAmbient, AudioCall::StopAmbient]
        );
    }

    #[test]
    fn test_failures_are_swallowed() {
        let mut dispatcher = AudioDispatcher::new(Box::new(FailingAudio));
        dispatcher.play_cue(Cue::StartChime);
        dispatcher.cancel_speech();
        dispatcher.start_ambient();
        assert!(!dispatcher.ambient_playing());
        dispatcher.stop_ambient();
    }

    #[test]
    fn test_broadcast_audio_publishes_commands() {
        let (tx, mut rx) = broadcast::channel(8);
        let audio = BroadcastAudio::new(tx);

        audio.play_cue(Cue::Phase { phase: BreathingPhase::In }).unwrap();
        audio.stop_ambient().unwrap();

        match rx.try_recv().unwrap() {
            SessionEvent::Audio { command } => assert_eq!(
                command,
                AudioCommand::PlayCue { cue: Cue::Phase { phase: BreathingPhase::In } }
            ),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::Audio { command: AudioCommand::StopAmbient }
        ));
    }

    #[test]
    fn test_broadcast_audio_without_subscribers_is_unavailable() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        let audio = BroadcastAudio::new(tx);
        assert!(matches!(
            audio.start_ambient(),
            Err(AudioError::Unavailable(_))
        ));
    }
}
