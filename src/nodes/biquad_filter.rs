//! Biquad filter node wrapping the `biquad` crate.
//!
//! Fixed-coefficient stages used by the muting chains: a lowpass to take the
//! top off the sample and a peaking boost to put back low-mid body.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz};

use crate::audio_graph::{AudioNode, ModInput, RenderWindow};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    LowPass { cutoff: f32, q: f32 },
    Peaking { frequency: f32, gain_db: f32, q: f32 },
}

pub struct BiquadFilterNode {
    filter: DirectForm2Transposed<f32>,
}

impl BiquadFilterNode {
    pub fn new(kind: FilterKind, sample_rate: f32) -> Self {
        let coeffs = match kind {
            FilterKind::LowPass { cutoff, q } => Coefficients::<f32>::from_params(
                biquad::Type::LowPass,
                sample_rate.hz(),
                cutoff.min(sample_rate * 0.45).hz(),
                q,
            )
            .unwrap(),
            FilterKind::Peaking {
                frequency,
                gain_db,
                q,
            } => Coefficients::<f32>::from_params(
                biquad::Type::PeakingEQ(gain_db),
                sample_rate.hz(),
                frequency.min(sample_rate * 0.45).hz(),
                q,
            )
            .unwrap(),
        };
        Self {
            filter: DirectForm2Transposed::<f32>::new(coeffs),
        }
    }
}

impl AudioNode for BiquadFilterNode {
    fn process(
        &mut self,
        inputs: &[&[f32]],
        _mods: &[ModInput<'_>],
        output: &mut [f32],
        _window: &RenderWindow,
    ) {
        for (i, out) in output.iter_mut().enumerate() {
            let mut acc = 0.0;
            for input in inputs {
                acc += input[i];
            }
            *out = self.filter.run(acc);
        }
    }

    fn name(&self) -> &str {
        "biquad_filter"
    }
}
