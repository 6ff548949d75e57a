//! Events module for session transitions
//!
//! Every state change of the session, and every audio request made by the
//! default backend, is published as a `SessionEvent` on a broadcast channel.
//! IPC subscribers receive them as push notifications.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::audio::AudioCommand;
use crate::session::{BreathingPhase, Settings};

/// Events emitted by the session core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Fresh countdown started
    SessionStarted {
        duration_secs: u32,
    },

    /// Countdown frozen
    SessionPaused {
        time_left_secs: u32,
    },

    /// Paused countdown continued
    SessionResumed {
        time_left_secs: u32,
    },

    /// Countdown reached zero
    SessionFinished,

    /// Back to idle with the full duration
    SessionReset {
        time_left_secs: u32,
    },

    /// One second elapsed
    Tick {
        time_left_secs: u32,
    },

    /// Breathing phase changed (including drops to idle)
    PhaseChanged {
        phase: BreathingPhase,
        /// Label shown for the phase, empty when hidden
        text: String,
    },

    /// A new duration was selected
    DurationChanged {
        duration_secs: u32,
        time_left_secs: u32,
    },

    /// A setting was toggled
    SettingsChanged {
        settings: Settings,
    },

    /// Audio request for the presentation layer to play
    Audio {
        command: AudioCommand,
    },
}

impl SessionEvent {
    /// High-frequency events that are not worth an info line
    fn is_noisy(&self) -> bool {
        matches!(self, SessionEvent::Tick { .. } | SessionEvent::Audio { .. })
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::SessionStarted { duration_secs } => {
                write!(f, "SESSION_STARTED ({}s)", duration_secs)
            }
            SessionEvent::SessionPaused { time_left_secs } => {
                write!(f, "SESSION_PAUSED ({}s left)", time_left_secs)
            }
            SessionEvent::SessionResumed { time_left_secs } => {
                write!(f, "SESSION_RESUMED ({}s left)", time_left_secs)
            }
            SessionEvent::SessionFinished => write!(f, "SESSION_FINISHED"),
            SessionEvent::SessionReset { time_left_secs } => {
                write!(f, "SESSION_RESET ({}s)", time_left_secs)
            }
            SessionEvent::Tick { time_left_secs } => write!(f, "TICK ({}s left)", time_left_secs),
            SessionEvent::PhaseChanged { phase, .. } => write!(f, "PHASE_CHANGED ({})", phase),
            SessionEvent::DurationChanged { duration_secs, .. } => {
                write!(f, "DURATION_CHANGED ({}s)", duration_secs)
            }
            SessionEvent::SettingsChanged { .. } => write!(f, "SETTINGS_CHANGED"),
            SessionEvent::Audio { command } => write!(f, "AUDIO ({:?})", command),
        }
    }
}

/// Log every event on the bus until it closes
pub async fn log_events(mut event_rx: broadcast::Receiver<SessionEvent>) {
    loop {
        match event_rx.recv().await {
            Ok(event) if event.is_noisy() => debug!(%event, "session event"),
            Ok(event) => info!(%event, "session event"),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "session event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
