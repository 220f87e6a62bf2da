//! Palm mute: lowpass, low-mid boost, level drop.
//!
//! The chain is spliced between the voice and the master: a 700 Hz lowpass
//! takes off the string brightness, a +20 dB peak at 120 Hz restores thump,
//! and a gain stage sets the muted level (louder when accented).

use crate::effects::EffectContext;
use crate::nodes::{BiquadFilterNode, FilterKind, GainNode};
use crate::voices::Voice;

pub const LOWPASS_HZ: f32 = 700.0;
pub const BOOST_HZ: f32 = 120.0;
pub const BOOST_DB: f32 = 20.0;

pub fn level(accent: bool) -> f32 {
    if accent {
        0.85
    } else {
        0.70
    }
}

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
    let out_gain = fx.ctx.add(Box::new(GainNode::new(level(fx.accent))));

    fx.ctx.connect(lowpass, boost);
    fx.ctx.connect(boost, out_gain);
    voice.insert_chain(lowpass, out_gain);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_graph::AudioContext;
    use crate::sampler::PlayOptions;
    use std::sync::Arc;

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    fn bright_buffer(sr: f32) -> Arc<Vec<f32>> {
        // A 3 kHz tone, squarely above the mute's lowpass.
        Arc::new(
            (0..(sr as usize * 2))
                .map(|i| (std::f32::consts::TAU * 3000.0 * i as f32 / sr).sin() * 0.5)
                .collect(),
        )
    }

    #[test]
    fn test_palm_mute_darkens_and_quiets() {
        let sr = 44100.0;

        let open_ctx = AudioContext::new(sr);
        let _open = Voice::spawn(
            &open_ctx,
            bright_buffer(sr),
            1.0,
            0.0,
            &PlayOptions::default(),
            0.0,
        );
        let open_rms = rms(&open_ctx.render(22050));

        let muted_ctx = AudioContext::new(sr);
        let mut voice = Voice::spawn(
            &muted_ctx,
            bright_buffer(sr),
            1.0,
            0.0,
            &PlayOptions::default(),
            0.0,
        );
        let fx = EffectContext {
            ctx: &muted_ctx,
            bpm: 120.0,
            when: 0.0,
            accent: false,
            palm_mute: true,
        };
        apply(&fx, &mut voice);
        let muted_rms = rms(&muted_ctx.render(22050));

        assert!(muted_rms < open_rms * 0.25, "{muted_rms} vs {open_rms}");
    }

    #[test]
    fn test_accent_raises_muted_level() {
        assert_eq!(level(false), 0.70);
        assert_eq!(level(true), 0.85);
    }
}
