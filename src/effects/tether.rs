//! Hammer-ons, pull-offs and column-to-column slides.
//!
//! A tethered note sounds without a fresh pluck: the ringing voice is
//! swapped for a source at the destination pitch, started past its attack
//! and faded in. Hammer-ons and pull-offs land instantly; slides glide the
//! detune from the origin fret over a fifth of a beat. Effects chained
//! onto the destination (a bend glyph or chord vibrato) start exactly when
//! the glide completes.

use crate::audio_graph::Param;
use crate::effects::bend::{ATTACK_SKIP, SPLICE_FADE_FLOOR, SPLICE_FADE_PEAK, SPLICE_FADE_SECS};
use crate::effects::{cents_from, vibrato, EffectContext};
use crate::resolve::{Transition, TransitionKind};
use crate::sampler::{PlayOptions, SampleRef};
use crate::voices::Voice;

fn glide_span(fx: &EffectContext<'_>, kind: TransitionKind) -> f64 {
    match kind {
        TransitionKind::HammerOn | TransitionKind::PullOff => 0.0,
        TransitionKind::SlideUp | TransitionKind::SlideDown => fx.beat() * 0.2,
        _ => fx.beat() * 0.25,
    }
}

/// Sound the destination note of a tether, replacing whatever rings on the
/// string. `chained_bend` and `vibrato` are follow-on effects written on
/// the destination column.
pub fn apply_tether(
    fx: &EffectContext<'_>,
    sample: &SampleRef,
    old: Option<Voice>,
    fret: u8,
    transition: &Transition,
    chained_bend: Option<u8>,
    vibrato: bool,
    opts: &PlayOptions,
) -> Voice {
    if let Some(old) = old {
        old.stop_at(fx.when);
    }

    let voice = Voice::spawn(
        fx.ctx,
        sample.buffer.clone(),
        sample.rate,
        fx.when,
        opts,
        ATTACK_SKIP,
    );
    let gain = voice.gain();
    gain.set_value_at(SPLICE_FADE_FLOOR * opts.gain, fx.when);
    gain.linear_ramp_to(SPLICE_FADE_PEAK * opts.gain, fx.when + SPLICE_FADE_SECS);

    let span = glide_span(fx, transition.kind);
    let detune = voice.detune();
    if span > 0.0 {
        detune.set_value_at(cents_from(transition.from_fret, fret), fx.when);
        detune.linear_ramp_to(0.0, fx.when + span);
    } else {
        detune.set_value_at(0.0, fx.when);
    }

    let chain_at = fx.when + span;
    if let Some(target) = chained_bend {
        schedule_chained_bend(fx, detune, fret, target, chain_at);
    }
    if vibrato {
        vibrato::attach_at(fx, &voice, chain_at, opts.duration);
    }
    voice
}

fn schedule_chained_bend(fx: &EffectContext<'_>, detune: &Param, fret: u8, target: u8, at: f64) {
    detune.set_value_at(0.0, at);
    detune.linear_ramp_to(cents_from(target, fret), at + fx.beat() * 0.5);
}
