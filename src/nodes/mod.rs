//! Concrete node implementations for the scheduled graph
//!
//! Four node types cover every voice and effect chain the engine builds:
//! sample playback with detune, gain staging, biquad filtering, and a sine
//! oscillator used as a vibrato LFO.

pub mod biquad_filter;
pub mod buffer_source;
pub mod gain;
pub mod oscillator;

pub use biquad_filter::{BiquadFilterNode, FilterKind};
pub use buffer_source::BufferSourceNode;
pub use gain::GainNode;
pub use oscillator::OscillatorNode;
