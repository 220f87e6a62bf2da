//! Per-note dispatch: one resolved note becomes graph activity.
//!
//! Four paths, chosen by the transition on the note:
//!   - continuation bend/release: splice the ringing voice, no pluck
//!   - tether (hammer-on, pull-off, slide between columns): swap the voice
//!   - bare glyph on a ringing note: attach vibrato in place
//!   - everything else: a fresh pluck, then muting chains and ramps

use tracing::debug;

use crate::effects::{self, EffectContext};
use crate::resolve::{NoteEffects, ResolvedNote, TransitionKind};
use crate::sampler::PlayOptions;
use crate::session::PlaybackSession;

/// Envelope table per effect kind. Later rows override earlier ones when
/// effects stack; dead wins over palm so the thud stays short.
pub(crate) fn note_play_options(effects: &NoteEffects) -> PlayOptions {
    let mut opts = PlayOptions::default();
    if effects.accent {
        opts.gain = 1.8;
    }
    if effects.staccato {
        opts.duration = 0.25;
    }
    if effects.palm_mute {
        opts.duration = 0.45;
        opts.gain = 0.01;
    }
    if effects.dead {
        opts.duration = 0.35;
        opts.gain = 0.01;
    }
    opts
}

impl PlaybackSession {
    /// Schedule one resolved note at absolute graph time `when` (the
    /// column onset plus its strum spread); all further timing is derived
    /// from that onset.
    pub fn play_note(&self, note: &ResolvedNote, when: f64) {
        let fx = EffectContext {
            ctx: &self.ctx,
            bpm: self.config.bpm,
            when,
            accent: note.effects.accent,
            palm_mute: note.effects.palm_mute,
        };
        let opts = note_play_options(&note.effects);
        let mut voices = self.voices.lock().unwrap();

        match note.transition {
            Some(t)
                if !t.pluck
                    && matches!(t.kind, TransitionKind::Bend | TransitionKind::Release) =>
            {
                let old = voices.take(note.string_index);
                if let Some(voice) = effects::bend::continue_pitch_ramp(&fx, old, note.fret, &t) {
                    if note.effects.vibrato {
                        let ramp_done = when + fx.beat() * 0.5;
                        effects::vibrato::attach_at(&fx, &voice, ramp_done, opts.duration);
                    }
                    voices.install(note.string_index, voice, when);
                }
            }
            Some(t)
                if matches!(
                    t.kind,
                    TransitionKind::HammerOn
                        | TransitionKind::PullOff
                        | TransitionKind::SlideUp
                        | TransitionKind::SlideDown
                ) =>
            {
                let midi = self.midi_note(note.string_index, note.fret);
                let sample = self.instrument.sample(midi);
                let old = voices.take(note.string_index);
                let voice = effects::tether::apply_tether(
                    &fx,
                    &sample,
                    old,
                    note.fret,
                    &t,
                    note.chained_bend,
                    note.effects.vibrato,
                    &opts,
                );
                voices.install(note.string_index, voice, when);
            }
            _ if !note.pluck => {
                // Bare glyph decorating whatever rings on the string.
                if note.effects.vibrato {
                    if let Some(voice) = voices.get(note.string_index) {
                        effects::vibrato::attach(&fx, voice, opts.duration);
                    } else {
                        debug!(string_index = note.string_index, "vibrato with no voice");
                    }
                }
            }
            _ => {
                let midi = self.midi_note(note.string_index, note.fret);
                let mut voice = self.instrument.play(&self.ctx, midi, when, &opts);
                if note.effects.dead {
                    effects::dead_note::apply(&fx, &mut voice);
                }
                if note.effects.palm_mute {
                    effects::palm_mute::apply(&fx, &mut voice);
                }
                if let Some(t) = &note.transition {
                    effects::bend::apply_pitch_ramp(&fx, &voice, note.fret, t);
                }
                if note.effects.vibrato {
                    effects::vibrato::attach(&fx, &voice, opts.duration);
                }
                voices.install(note.string_index, voice, when);
            }
        }
    }
}
