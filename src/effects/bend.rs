//! Bend, release and arbitrary-slide pitch ramps.
//!
//! All three are detune automation on a buffer source: 100 cents per fret,
//! ramped linearly. Bends and releases run over half a beat, arbitrary
//! slides over a quarter beat. A post-note slide-out (from-fret equal to
//! the sounding fret) waits half a beat before departing.
//!
//! Continuation bends (`3b 5` ... `3b` again, or a release of a ringing
//! bend) cannot re-pluck. The ringing voice is replaced with a fresh source
//! reading the same buffer from past its attack, faded in so the splice
//! stays inaudible, and the ramp is scheduled on the replacement.

use tracing::debug;

use crate::effects::{cents_from, EffectContext};
use crate::resolve::{Transition, TransitionKind};
use crate::sampler::PlayOptions;
use crate::voices::Voice;

/// How far into the buffer a continuation source starts, past the pluck
/// transient, seconds.
pub const ATTACK_SKIP: f64 = 0.2;
/// Fade masking the continuation splice.
pub const SPLICE_FADE_FLOOR: f32 = 0.01;
pub const SPLICE_FADE_PEAK: f32 = 1.3;
pub const SPLICE_FADE_SECS: f64 = 0.1;

fn ramp_span(fx: &EffectContext<'_>, fret: u8, transition: &Transition) -> (f64, f64) {
    match transition.kind {
        TransitionKind::ArbitrarySlide if transition.from_fret == fret => {
            // Slide out: hold the note, then leave.
            (fx.when + fx.beat() * 0.5, fx.beat() * 0.25)
        }
        TransitionKind::ArbitrarySlide => (fx.when, fx.beat() * 0.25),
        _ => (fx.when, fx.beat() * 0.5),
    }
}

/// Schedule the transition's detune ramp on a freshly plucked voice.
pub fn apply_pitch_ramp(fx: &EffectContext<'_>, voice: &Voice, fret: u8, transition: &Transition) {
    let (start, span) = ramp_span(fx, fret, transition);
    let detune = voice.detune();
    detune.set_value_at(cents_from(transition.from_fret, fret), start);
    detune.linear_ramp_to(cents_from(transition.to_fret, fret), start + span);
}

/// Bend or release an already-ringing note. Returns the replacement voice,
/// or `None` when nothing was ringing on the string.
pub fn continue_pitch_ramp(
    fx: &EffectContext<'_>,
    old: Option<Voice>,
    fret: u8,
    transition: &Transition,
) -> Option<Voice> {
    let Some(old) = old else {
        debug!(fret, ?transition.kind, "continuation with no ringing voice, dropping");
        return None;
    };
    old.stop_at(fx.when);

    let voice = Voice::spawn(
        fx.ctx,
        old.buffer().clone(),
        old.rate(),
        fx.when,
        &PlayOptions::default(),
        ATTACK_SKIP,
    );
    let gain = voice.gain();
    gain.set_value_at(SPLICE_FADE_FLOOR, fx.when);
    gain.linear_ramp_to(SPLICE_FADE_PEAK, fx.when + SPLICE_FADE_SECS);

    apply_pitch_ramp(fx, &voice, fret, transition);
    Some(voice)
}
