//! Slap: a column-wide percussive hit replacing the strings.
//!
//! Every ringing voice is choked, then a short synthesized thump plays: a
//! 200 Hz sine for body plus a white-noise burst for snap, through a
//! lowpass and a 500 Hz presence boost, with an exponential decay. The
//! level depends on accent and palm-mute context.

use std::sync::Arc;

use rand::Rng;

use crate::audio_graph::AudioNode;
use crate::effects::EffectContext;
use crate::nodes::{BiquadFilterNode, BufferSourceNode, FilterKind, GainNode, OscillatorNode};
use crate::voices::StringVoices;

pub const DURATION: f64 = 0.25;
pub const BODY_HZ: f32 = 200.0;
pub const LOWPASS_HZ: f32 = 2200.0;
pub const BOOST_HZ: f32 = 500.0;
pub const BOOST_DB: f32 = 8.0;

pub fn level(accent: bool, palm_mute: bool) -> f32 {
    match (accent, palm_mute) {
        (false, false) => 0.25,
        (true, false) => 0.45,
        (false, true) => 0.10,
        (true, true) => 0.30,
    }
}

pub fn play(fx: &EffectContext<'_>, voices: &mut StringVoices) {
    voices.stop_all(fx.when);

    let sr = fx.ctx.sample_rate();
    let mut body = OscillatorNode::new(BODY_HZ, fx.when);
    body.stop(fx.when + DURATION);
    let body_id = fx.ctx.add(Box::new(body));

    let mut rng = rand::thread_rng();
    let noise: Vec<f32> = (0..(sr as f64 * DURATION) as usize)
        .map(|_| rng.gen::<f32>() * 2.0 - 1.0)
        .collect();
    let noise_id = fx.ctx.add(Box::new(BufferSourceNode::new(
        Arc::new(noise),
        1.0,
        fx.when,
        0.0,
        sr,
    )));

    let lowpass = fx.ctx.add(Box::new(BiquadFilterNode::new(
        FilterKind::LowPass {
            cutoff: LOWPASS_HZ,
            q: 0.707,
        },
        sr,
    )));
    let boost = fx.ctx.add(Box::new(BiquadFilterNode::new(
        FilterKind::Peaking {
            frequency: BOOST_HZ,
            gain_db: BOOST_DB,
            q: 1.0,
        },
        sr,
    )));

    let out = GainNode::new(0.0);
    let out_gain = out.param();
    let out_id = fx.ctx.add(Box::new(out));
    out_gain.set_value_at(level(fx.accent, fx.palm_mute), fx.when);
    out_gain.exponential_ramp_to(0.001, fx.when + DURATION);

    fx.ctx.connect(body_id, lowpass);
    fx.ctx.connect(noise_id, lowpass);
    fx.ctx.connect(lowpass, boost);
    fx.ctx.connect(boost, out_id);
    fx.ctx.connect(out_id, fx.ctx.master());
}
