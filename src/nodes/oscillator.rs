//! Sine oscillator, used as the vibrato LFO.

use std::f64::consts::TAU;

use crate::audio_graph::{AudioNode, ModInput, Param, ParamKind, RenderWindow};

pub struct OscillatorNode {
    frequency: Param,
    phase: f64,
    start_time: f64,
    stop_time: Option<f64>,
    done: bool,
}

impl OscillatorNode {
    pub fn new(frequency: f32, start_time: f64) -> Self {
        Self {
            frequency: Param::new(frequency),
            phase: 0.0,
            start_time,
            stop_time: None,
            done: false,
        }
    }

    pub fn frequency(&self) -> Param {
        self.frequency.clone()
    }
}

impl AudioNode for OscillatorNode {
    fn process(
        &mut self,
        _inputs: &[&[f32]],
        mods: &[ModInput<'_>],
        output: &mut [f32],
        window: &RenderWindow,
    ) {
        let curve = self.frequency.curve();
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
            let mut freq = curve.value_at(t);
            for m in mods {
                if m.param == ParamKind::Frequency {
                    freq += m.buffer[i];
                }
            }
            *out = (self.phase * TAU).sin() as f32;
            self.phase = (self.phase + freq as f64 / window.sample_rate as f64).fract();
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
        "oscillator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oscillator_period() {
        let mut osc = OscillatorNode::new(1.0, 0.0);
        let mut out = [0.0f32; 8];
        let window = RenderWindow {
            start_time: 0.0,
            sample_rate: 8.0,
        };
        osc.process(&[], &[], &mut out, &window);
        assert!((out[0]).abs() < 1e-6);
        assert!((out[2] - 1.0).abs() < 1e-6);
        assert!((out[6] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stop_silences_and_finishes() {
        let mut osc = OscillatorNode::new(100.0, 0.0);
        osc.stop(0.5);
        let mut out = [0.0f32; 8];
        let window = RenderWindow {
            start_time: 0.0,
            sample_rate: 8.0,
        };
        osc.process(&[], &[], &mut out, &window);
        assert!(out[4..].iter().all(|s| *s == 0.0));
        assert!(osc.finished(0.5));
    }
}
