//! Instruments: sources of pitched sample buffers
//!
//! An [`Instrument`] maps a MIDI note number to a mono buffer plus a base
//! playback rate. Two implementations ship: a Karplus-Strong string model
//! that synthesizes (and caches) a pluck per pitch, and a sample bank that
//! repitches loaded recordings to the nearest key.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use rand::Rng;
use tracing::debug;

use crate::audio_graph::AudioContext;
use crate::voices::Voice;

/// Per-note envelope settings; the effect kind on the note decides them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    /// Scheduled ring time, seconds.
    pub duration: f64,
    pub gain: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            duration: 3.0,
            gain: 1.0,
        }
    }
}

/// A pitched buffer ready to feed a source node. `rate` repitches the
/// buffer when it was not recorded at the requested note.
#[derive(Clone)]
pub struct SampleRef {
    pub buffer: Arc<Vec<f32>>,
    pub rate: f64,
}

pub trait Instrument: Send + Sync {
    fn sample(&self, midi: i32) -> SampleRef;

    /// Spawn a voice for `midi` at `when`, routed to the context master.
    fn play(&self, ctx: &AudioContext, midi: i32, when: f64, opts: &PlayOptions) -> Voice {
        let sample = self.sample(midi);
        Voice::spawn(ctx, sample.buffer, sample.rate, when, opts, 0.0)
    }
}

fn midi_to_hz(midi: i32) -> f64 {
    440.0 * 2f64.powf((midi - 69) as f64 / 12.0)
}

/// Karplus-Strong plucked string: a noise burst circulating through a
/// delay line with a two-point average damping filter in the feedback path.
pub struct PluckedInstrument {
    sample_rate: f32,
    cache: Mutex<HashMap<i32, Arc<Vec<f32>>>>,
}

impl PluckedInstrument {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn synthesize(&self, midi: i32) -> Vec<f32> {
        let sr = self.sample_rate as f64;
        let freq = midi_to_hz(midi.clamp(12, 108));
        // Rounding the delay to whole samples detunes high notes slightly;
        // tolerable for a fretted instrument at guitar pitches.
        let delay = (sr / freq).round().max(2.0) as usize;

        let mut rng = rand::thread_rng();
        let mut line: Vec<f32> = (0..delay).map(|_| rng.gen::<f32>() * 1.8 - 0.9).collect();

        let frames = (sr * 3.2) as usize;
        let decay = 0.996f32;
        let mut out = Vec::with_capacity(frames);
        for i in 0..frames {
            let pos = i % delay;
            let current = line[pos];
            let next = line[(pos + 1) % delay];
            out.push(current);
            line[pos] = decay * 0.5 * (current + next);
        }
        out
    }
}

impl Instrument for PluckedInstrument {
    fn sample(&self, midi: i32) -> SampleRef {
        let mut cache = self.cache.lock().unwrap();
        let buffer = cache
            .entry(midi)
            .or_insert_with(|| {
                debug!(midi, "synthesizing pluck");
                Arc::new(self.synthesize(midi))
            })
            .clone();
        SampleRef { buffer, rate: 1.0 }
    }
}

/// Recorded samples keyed by MIDI note; lookups repitch from the nearest
/// loaded key. An empty bank yields silence rather than failing.
#[derive(Default)]
pub struct SampleBankInstrument {
    samples: BTreeMap<i32, Arc<Vec<f32>>>,
}

impl SampleBankInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn insert(&mut self, midi: i32, samples: Vec<f32>) {
        self.samples.insert(midi, Arc::new(samples));
    }

    /// Load a WAV file as the sample for `midi`. Multi-channel files are
    /// mixed down to mono.
    pub fn load_wav(&mut self, midi: i32, path: &Path) -> Result<(), hound::Error> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels as usize;

        let mono: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => downmix(reader.samples::<f32>(), channels)?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                downmix(
                    reader.samples::<i32>().map(|s| s.map(|v| v as f32 * scale)),
                    channels,
                )?
            }
        };

        debug!(midi, frames = mono.len(), "loaded sample");
        self.samples.insert(midi, Arc::new(mono));
        Ok(())
    }

    fn nearest(&self, midi: i32) -> Option<(i32, &Arc<Vec<f32>>)> {
        let below = self.samples.range(..=midi).next_back();
        let above = self.samples.range(midi..).next();
        match (below, above) {
            (Some((bk, bv)), Some((ak, av))) => {
                if (midi - bk) <= (ak - midi) {
                    Some((*bk, bv))
                } else {
                    Some((*ak, av))
                }
            }
            (Some((k, v)), None) | (None, Some((k, v))) => Some((*k, v)),
            (None, None) => None,
        }
    }
}

fn downmix<E>(
    samples: impl Iterator<Item = Result<f32, E>>,
    channels: usize,
) -> Result<Vec<f32>, E> {
    let mut mono = Vec::new();
    let mut acc = 0.0f32;
    let mut in_frame = 0usize;
    for sample in samples {
        acc += sample?;
        in_frame += 1;
        if in_frame == channels {
            mono.push(acc / channels as f32);
            acc = 0.0;
            in_frame = 0;
        }
    }
    Ok(mono)
}

impl Instrument for SampleBankInstrument {
    fn sample(&self, midi: i32) -> SampleRef {
        match self.nearest(midi) {
            Some((key, buffer)) => SampleRef {
                buffer: buffer.clone(),
                rate: 2f64.powf((midi - key) as f64 / 12.0),
            },
            None => SampleRef {
                buffer: Arc::new(vec![0.0]),
                rate: 1.0,
            },
        }
    }
}
