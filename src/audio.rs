//! Real-time audio output using cpal
//! Works with JACK, ALSA, OpenSL ES (Android/Termux), etc.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use crate::audio_graph::AudioContext;

/// Owns the output stream; the returned [`AudioContext`] is the handle for
/// all scheduling. The stream stops when this is dropped.
pub struct AudioOutput {
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl AudioOutput {
    pub fn open() -> Result<(Self, AudioContext), Box<dyn std::error::Error>> {
        // Get the default audio host (JACK/ALSA/OpenSL ES/etc)
        let host = cpal::default_host();
        info!("Audio host: {:?}", host.id());

        let device = host
            .default_output_device()
            .ok_or("No audio output device found")?;
        info!("Audio device: {}", device.name()?);

        let config = device.default_output_config()?;
        info!("Audio config: {:?}", config);

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let ctx = AudioContext::new(sample_rate as f32);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), ctx.clone(), channels)
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), ctx.clone(), channels)
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), ctx.clone(), channels)
            }
            _ => return Err("Unsupported sample format".into()),
        }?;

        stream.play()?;
        info!("Audio stream started at {} Hz", sample_rate);

        Ok((
            Self {
                sample_rate,
                _stream: stream,
            },
            ctx,
        ))
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        ctx: AudioContext,
        channels: usize,
    ) -> Result<cpal::Stream, Box<dyn std::error::Error>>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let mut mono: Vec<f32> = Vec::new();
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                mono.resize(frames, 0.0);
                ctx.process_block(&mut mono);

                for (frame, sample) in data.chunks_mut(channels).zip(&mono) {
                    // Soft clipping to prevent distortion
                    let value = T::from_sample(sample.tanh() * 0.8);
                    for channel in frame.iter_mut() {
                        *channel = value;
                    }
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )?;

        Ok(stream)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
