//! Per-string voice registry
//!
//! Each of the six strings owns at most one ringing voice. A new event on a
//! string evicts whatever is ringing there with a short fade; continuation
//! effects take the voice out, splice a fresh source and put it back.

use std::sync::Arc;

use crate::audio_graph::{AudioContext, NodeId, Param};
use crate::nodes::{BufferSourceNode, GainNode};
use crate::sampler::PlayOptions;
use crate::tab::STRING_COUNT;

/// Fade used when a voice is evicted or stopped, seconds.
const STOP_FADE: f64 = 0.02;
/// Envelope release at the end of a voice's scheduled duration.
const RELEASE: f64 = 0.03;

/// One scheduled source -> gain chain in the graph, with enough state kept
/// to splice a continuation source from the same sample later.
pub struct Voice {
    ctx: AudioContext,
    source: NodeId,
    /// Last node before the master; effect chains re-route this.
    output: NodeId,
    gain: Param,
    detune: Param,
    buffer: Arc<Vec<f32>>,
    rate: f64,
}

impl Voice {
    /// Build source -> gain -> master and schedule the note envelope.
    /// `start_offset` skips into the sample (seconds of buffer time).
    pub fn spawn(
        ctx: &AudioContext,
        buffer: Arc<Vec<f32>>,
        rate: f64,
        when: f64,
        opts: &PlayOptions,
        start_offset: f64,
    ) -> Self {
        let source_node =
            BufferSourceNode::new(buffer.clone(), rate, when, start_offset, ctx.sample_rate());
        let detune = source_node.detune();
        let source = ctx.add(Box::new(source_node));

        let gain_node = GainNode::new(opts.gain);
        let gain = gain_node.param();
        let gain_id = ctx.add(Box::new(gain_node));

        let end = when + opts.duration;
        let release_at = (end - RELEASE).max(when);
        gain.set_value_at(opts.gain, release_at);
        gain.linear_ramp_to(0.0, end);

        ctx.connect(source, gain_id);
        ctx.connect(gain_id, ctx.master());
        ctx.stop_node(source, end);

        Self {
            ctx: ctx.clone(),
            source,
            output: gain_id,
            gain,
            detune,
            buffer,
            rate,
        }
    }

    pub fn gain(&self) -> &Param {
        &self.gain
    }

    /// Detune of the underlying source, in cents.
    pub fn detune(&self) -> &Param {
        &self.detune
    }

    pub fn buffer(&self) -> &Arc<Vec<f32>> {
        &self.buffer
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn source_node(&self) -> NodeId {
        self.source
    }

    /// Splice a processing chain between this voice and the master.
    /// Repeated calls nest: the previous chain feeds the new one.
    pub fn insert_chain(&mut self, head: NodeId, tail: NodeId) {
        self.ctx.disconnect(self.output, self.ctx.master());
        self.ctx.connect(self.output, head);
        self.ctx.connect(tail, self.ctx.master());
        self.output = tail;
    }

    /// Fade out and stop at `at`. Safe on already-collected voices.
    pub fn stop_at(&self, at: f64) {
        self.gain.anchor(at);
        self.gain.linear_ramp_to(0.0, at + STOP_FADE);
        self.ctx.stop_node(self.source, at + STOP_FADE);
    }
}

/// The six per-string voice slots.
#[derive(Default)]
pub struct StringVoices {
    slots: [Option<Voice>; STRING_COUNT],
}

impl StringVoices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, string_index: usize) -> Option<&Voice> {
        self.slots[string_index - 1].as_ref()
    }

    /// Remove and return the ringing voice so a continuation can splice it.
    pub fn take(&mut self, string_index: usize) -> Option<Voice> {
        self.slots[string_index - 1].take()
    }

    /// Register a voice on its string, fading out whatever was ringing.
    pub fn install(&mut self, string_index: usize, voice: Voice, at: f64) {
        if let Some(old) = self.slots[string_index - 1].replace(voice) {
            old.stop_at(at);
        }
    }

    pub fn stop_all(&mut self, at: f64) {
        for slot in &mut self.slots {
            if let Some(voice) = slot.take() {
                voice.stop_at(at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_voice(ctx: &AudioContext) -> Voice {
        let buffer = Arc::new(vec![0.5f32; 44100]);
        Voice::spawn(ctx, buffer, 1.0, 0.0, &PlayOptions::default(), 0.0)
    }

    #[test]
    fn test_install_evicts_previous_voice() {
        let ctx = AudioContext::new(44100.0);
        let mut voices = StringVoices::new();
        let first = test_voice(&ctx);
        let first_gain = first.gain().clone();
        voices.install(2, first, 0.1);
        voices.install(2, test_voice(&ctx), 0.1);
        // Evicted voice fades to zero right after the handoff.
        assert!(first_gain.value_at(0.13) < 1e-6);
        assert!(voices.get(2).is_some());
        assert!(voices.get(1).is_none());
    }

    #[test]
    fn test_stop_all_clears_slots() {
        let ctx = AudioContext::new(44100.0);
        let mut voices = StringVoices::new();
        voices.install(1, test_voice(&ctx), 0.0);
        voices.install(6, test_voice(&ctx), 0.0);
        voices.stop_all(0.0);
        assert!(voices.get(1).is_none());
        assert!(voices.get(6).is_none());
    }

    #[test]
    fn test_voice_renders_audio_then_envelope_closes() {
        let ctx = AudioContext::new(44100.0);
        let voice = Voice::spawn(
            &ctx,
            Arc::new(vec![0.5f32; 44100 * 4]),
            1.0,
            0.0,
            &PlayOptions {
                duration: 0.5,
                gain: 1.0,
            },
            0.0,
        );
        let _ = &voice;
        let out = ctx.render(44100);
        let first_half_peak = out[..22050].iter().fold(0.0f32, |a, s| a.max(s.abs()));
        let tail_peak = out[30000..].iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!(first_half_peak > 0.4);
        assert!(tail_peak < 1e-3);
    }
}
