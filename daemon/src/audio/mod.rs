//! Audio coordination
//!
//! The policy decides what should be heard for each session transition; the
//! collaborator is whatever actually produces sound. The core never blocks
//! on audio and never fails because of it.

mod collaborator;
mod cue;
mod policy;

pub use collaborator::{AudioCollaborator, AudioCommand, AudioDispatcher, BroadcastAudio};
pub use cue::Cue;
pub use policy::{decide, AmbientAction, AudioEvent, BreathingDirective, PolicyInput};

#[cfg(test)]
pub(crate) use collaborator::testing;
