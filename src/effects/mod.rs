//! Playing-technique emulation
//!
//! Each submodule turns one notation effect into graph edits: parameter
//! ramps on a voice, filter chains spliced before the master, or extra
//! nodes (the vibrato LFO, the slap percussion). They all take an
//! [`EffectContext`] carrying the shared timing inputs.

pub mod bend;
pub mod dead_note;
pub mod palm_mute;
pub mod slap;
pub mod tether;
pub mod vibrato;

use crate::audio_graph::AudioContext;

/// Timing and accent context shared by every effect processor.
pub struct EffectContext<'a> {
    pub ctx: &'a AudioContext,
    pub bpm: f64,
    /// Absolute onset time of the column event being processed.
    pub when: f64,
    pub accent: bool,
    pub palm_mute: bool,
}

impl EffectContext<'_> {
    /// Quarter-note duration at the session tempo, seconds.
    pub fn beat(&self) -> f64 {
        60.0 / self.bpm
    }
}

/// Cents offset of `fret` relative to the fret a voice's buffer sounds at.
pub(crate) fn cents_from(fret: u8, base_fret: u8) -> f32 {
    (fret as f32 - base_fret as f32) * 100.0
}
