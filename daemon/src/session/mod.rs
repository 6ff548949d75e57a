//! Session core
//!
//! Two cooperating state machines driven by one tick:
//! - SessionClock: Idle -> Running <-> Paused -> Finished
//! - BreathingCycle: Idle -> In -> Hold -> Out -> In ...
//!
//! `Session` composes them with the settings and routes every transition
//! through the audio policy. `SessionRunner` serializes user commands and
//! ticks onto a single loop.

mod breathing;
mod clock;
mod machine;
mod runner;
mod settings;
mod snapshot;

pub use breathing::BreathingPhase;
pub use clock::{DurationError, SessionDuration, TimerState};
pub use machine::{Session, SessionError};
pub use runner::{Action, SessionHandle, SessionRunner};
pub use settings::Settings;
pub use snapshot::{DurationOption, SessionSnapshot};
