//! Offline rendering: drive the graph clock without a device and write WAV.

use std::path::Path;

use tracing::info;

use crate::audio_graph::AudioContext;

#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    pub block_size: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { block_size: 512 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    pub frames: usize,
    pub peak: f32,
    pub rms: f32,
}

fn stats(samples: &[f32]) -> RenderStats {
    let peak = samples.iter().fold(0.0f32, |a, s| a.max(s.abs()));
    let rms = if samples.is_empty() {
        0.0
    } else {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    };
    RenderStats {
        frames: samples.len(),
        peak,
        rms,
    }
}

/// Render `duration` seconds of the context into a buffer.
pub fn render_to_buffer(ctx: &AudioContext, duration: f64, config: &RenderConfig) -> Vec<f32> {
    let frames = (duration * ctx.sample_rate() as f64).ceil() as usize;
    let mut out = vec![0.0f32; frames];
    for chunk in out.chunks_mut(config.block_size.max(1)) {
        ctx.process_block(chunk);
    }
    out
}

/// Render and write a mono 32-bit float WAV.
pub fn render_to_wav(
    ctx: &AudioContext,
    path: &Path,
    duration: f64,
    config: &RenderConfig,
) -> Result<RenderStats, hound::Error> {
    let samples = render_to_buffer(ctx, duration, config);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: ctx.sample_rate() as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in &samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    let stats = stats(&samples);
    info!(
        path = %path.display(),
        frames = stats.frames,
        peak = stats.peak,
        "wrote render"
    );
    Ok(stats)
}
