//! Vibrato: a sine LFO modulating a voice's detune.
//!
//! The LFO rate tracks tempo, clamped to a musical 3-8 Hz, and the depth is
//! a fixed 25 cents. Applied to a plucked note it waits a short onset so
//! the attack speaks cleanly; chained after a tether it starts when the
//! glide completes.

use crate::audio_graph::{AudioNode, ParamKind};
use crate::effects::EffectContext;
use crate::nodes::{GainNode, OscillatorNode};
use crate::voices::Voice;

pub const DEPTH_CENTS: f32 = 25.0;

/// Tempo-tracking LFO rate in Hz.
pub fn rate_hz(bpm: f64) -> f64 {
    (600.0 / bpm).clamp(3.0, 8.0)
}

/// Attach vibrato to a plucked note, starting after the usual onset delay.
pub fn attach(fx: &EffectContext<'_>, voice: &Voice, duration: f64) {
    attach_at(fx, voice, fx.when + fx.beat() * 0.15, duration);
}

/// Attach vibrato starting at an explicit time.
pub fn attach_at(fx: &EffectContext<'_>, voice: &Voice, start: f64, duration: f64) {
    let mut lfo = OscillatorNode::new(rate_hz(fx.bpm) as f32, start);
    lfo.stop(start + duration);
    let lfo_id = fx.ctx.add(Box::new(lfo));

    let depth = GainNode::new(DEPTH_CENTS);
    let depth_id = fx.ctx.add(Box::new(depth));

    fx.ctx.connect(lfo_id, depth_id);
    fx.ctx
        .connect_to_param(depth_id, voice.source_node(), ParamKind::Detune);
}
