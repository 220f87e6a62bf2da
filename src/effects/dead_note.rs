//! Dead (fretted-hand muted) note: a short percussive thud.
//!
//! Same chain shape as the palm mute with a gentler boost and a lower
//! level; combined with the dead note's short envelope it reads as pitch-
//! less attack. When a dead note sits inside a palm-mute span both chains
//! apply, dead first.

use crate::effects::EffectContext;
use crate::nodes::{BiquadFilterNode, FilterKind, GainNode};
use crate::voices::Voice;

pub const LOWPASS_HZ: f32 = 700.0;
pub const BOOST_HZ: f32 = 120.0;
pub const BOOST_DB: f32 = 12.0;
pub const LEVEL: f32 = 0.40;

pub fn apply(fx: &EffectContext<'_>, voice: &mut Voice) {
    let sr = fx.ctx.sample_rate();
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
    let out_gain = fx.ctx.add(Box::new(GainNode::new(LEVEL)));

    fx.ctx.connect(lowpass, boost);
    fx.ctx.connect(boost, out_gain);
    voice.insert_chain(lowpass, out_gain);
}
