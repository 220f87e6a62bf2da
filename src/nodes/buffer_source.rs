//! Sample-playback source with detunable pitch.
//!
//! Plays a mono buffer once, starting at a scheduled time, resampling by a
//! fixed base rate times a cents-valued detune. The detune parameter is the
//! hook every pitch effect uses: bends, releases, slides and the vibrato LFO
//! all drive it, the last one through a modulation edge.

use std::sync::Arc;

use crate::audio_graph::{AudioNode, ModInput, Param, ParamKind, RenderWindow};

pub struct BufferSourceNode {
    buffer: Arc<Vec<f32>>,
    /// Base playback rate; 1.0 plays the buffer at its recorded pitch.
    rate: f64,
    detune: Param,
    start_time: f64,
    stop_time: Option<f64>,
    /// Fractional read position in frames.
    position: f64,
    done: bool,
}

impl BufferSourceNode {
    /// `start_offset` skips into the buffer, in seconds of buffer time.
    pub fn new(
        buffer: Arc<Vec<f32>>,
        rate: f64,
        start_time: f64,
        start_offset: f64,
        sample_rate: f32,
    ) -> Self {
        Self {
            buffer,
            rate,
            detune: Param::new(0.0),
            start_time,
            stop_time: None,
            position: start_offset.max(0.0) * sample_rate as f64,
            done: false,
        }
    }

    /// Detune automation handle, in cents.
    pub fn detune(&self) -> Param {
        self.detune.clone()
    }
}

impl AudioNode for BufferSourceNode {
    fn process(
        &mut self,
        _inputs: &[&[f32]],
        mods: &[ModInput<'_>],
        output: &mut [f32],
        window: &RenderWindow,
    ) {
        let curve = self.detune.curve();
        let len = self.buffer.len();
        for (i, out) in output.iter_mut().enumerate() {
            *out = 0.0;
            if self.done {
                continue;
            }
            let t = window.time_at(i);
            if t < self.start_time {
                continue;
            }
            if self.stop_time.is_some_and(|stop| t >= stop) {
                self.done = true;
                continue;
            }
            let frame = self.position as usize;
            if frame + 1 >= len {
                self.done = true;
                continue;
            }
            let frac = (self.position - frame as f64) as f32;
            *out = self.buffer[frame] * (1.0 - frac) + self.buffer[frame + 1] * frac;

            let mut cents = curve.value_at(t);
            for m in mods {
                if m.param == ParamKind::Detune {
                    cents += m.buffer[i];
                }
            }
            self.position += self.rate * 2f64.powf(cents as f64 / 1200.0);
        }
    }

    fn stop(&mut self, at: f64) {
        self.stop_time = Some(match self.stop_time {
            Some(existing) => existing.min(at),
            None => at,
        });
    }

    fn finished(&self, now: f64) -> bool {
        self.done || self.stop_time.is_some_and(|stop| now >= stop)
    }

    fn name(&self) -> &str {
        "buffer_source"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: f64, sr: f32) -> RenderWindow {
        RenderWindow {
            start_time: start,
            sample_rate: sr,
        }
    }

    #[test]
    fn test_waits_for_start_time() {
        let buf = Arc::new(vec![1.0f32; 64]);
        let mut src = BufferSourceNode::new(buf, 1.0, 0.5, 0.0, 8.0);
        let mut out = [0.0f32; 8];
        src.process(&[], &[], &mut out, &window(0.0, 8.0));
        assert!(out[..4].iter().all(|s| *s == 0.0));
        assert!(out[4..].iter().all(|s| *s == 1.0));
    }

    #[test]
    fn test_detune_raises_playback_rate() {
        // +1200 cents doubles the read rate.
        let buf: Arc<Vec<f32>> = Arc::new((0..1000).map(|i| i as f32).collect());
        let mut src = BufferSourceNode::new(buf, 1.0, 0.0, 0.0, 100.0);
        src.detune().set_value_at(1200.0, 0.0);
        let mut out = [0.0f32; 10];
        src.process(&[], &[], &mut out, &window(0.0, 100.0));
        assert!((out[9] - 18.0).abs() < 1e-4);
    }

    #[test]
    fn test_finishes_at_buffer_end_and_stop_time() {
        let buf = Arc::new(vec![1.0f32; 4]);
        let mut src = BufferSourceNode::new(buf, 1.0, 0.0, 0.0, 8.0);
        let mut out = [0.0f32; 8];
        src.process(&[], &[], &mut out, &window(0.0, 8.0));
        assert!(src.finished(1.0));

        let buf = Arc::new(vec![1.0f32; 1000]);
        let mut src = BufferSourceNode::new(buf, 1.0, 0.0, 0.0, 8.0);
        src.stop(0.5);
        let mut out = [0.0f32; 8];
        src.process(&[], &[], &mut out, &window(0.0, 8.0));
        assert!(out[..4].iter().all(|s| *s == 1.0));
        assert!(out[4..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_start_offset_skips_attack() {
        let buf: Arc<Vec<f32>> = Arc::new((0..100).map(|i| i as f32).collect());
        let mut src = BufferSourceNode::new(buf, 1.0, 0.0, 0.5, 10.0);
        let mut out = [0.0f32; 1];
        src.process(&[], &[], &mut out, &window(0.0, 10.0));
        assert_eq!(out[0], 5.0);
    }
}
