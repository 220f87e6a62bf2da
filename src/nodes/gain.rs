//! Gain node: sums its audio inputs and scales them by an automatable gain.

use crate::audio_graph::{AudioNode, ModInput, Param, ParamKind, RenderWindow};

pub struct GainNode {
    gain: Param,
}

impl GainNode {
    pub fn new(initial: f32) -> Self {
        Self {
            gain: Param::new(initial),
        }
    }

    /// Automation handle. Clone it before boxing the node into the graph.
    pub fn param(&self) -> Param {
        self.gain.clone()
    }
}

impl AudioNode for GainNode {
    fn process(
        &mut self,
        inputs: &[&[f32]],
        mods: &[ModInput<'_>],
        output: &mut [f32],
        window: &RenderWindow,
    ) {
        let curve = self.gain.curve();
        for (i, out) in output.iter_mut().enumerate() {
            let mut gain = curve.value_at(window.time_at(i));
            for m in mods {
                if m.param == ParamKind::Gain {
                    gain += m.buffer[i];
                }
            }
            let mut acc = 0.0;
            for input in inputs {
                acc += input[i];
            }
            *out = acc * gain;
        }
    }

    fn name(&self) -> &str {
        "gain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_sums_and_scales() {
        let mut node = GainNode::new(0.5);
        let a = [1.0f32; 4];
        let b = [0.5f32; 4];
        let mut out = [0.0f32; 4];
        let window = RenderWindow {
            start_time: 0.0,
            sample_rate: 44100.0,
        };
        node.process(&[&a, &b], &[], &mut out, &window);
        assert!(out.iter().all(|s| (*s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_gain_ramp_is_sample_accurate() {
        let node_gain;
        let mut node = {
            let n = GainNode::new(0.0);
            node_gain = n.param();
            n
        };
        node_gain.set_value_at(0.0, 0.0);
        node_gain.linear_ramp_to(1.0, 1.0);

        let input = [1.0f32; 4];
        let mut out = [0.0f32; 4];
        let window = RenderWindow {
            start_time: 0.5,
            sample_rate: 4.0,
        };
        node.process(&[&input], &[], &mut out, &window);
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert!(out[1] > out[0] && out[2] > out[1]);
    }
}
