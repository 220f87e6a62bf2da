//! Playback session: tab columns in, scheduled graph events out.
//!
//! The session walks columns one beat apiece, resolving each string
//! through the five-column window and handing resolved notes to the note
//! player. Audible timing comes entirely from graph scheduling; the async
//! pacing only keeps the walk roughly a beat ahead of the renderer.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::audio_graph::AudioContext;
use crate::cell::ParseError;
use crate::column_window::ColumnWindow;
use crate::effects::{self, EffectContext};
use crate::resolve::{
    chord_delay_multiplier, first_sounding_string, resolve_string, strum_offset, strum_order,
};
use crate::sampler::Instrument;
use crate::tab::{Column, STRING_COUNT};
use crate::voices::StringVoices;

/// Standard-tuning string offsets relative to C3, low E to high E.
pub const E_STANDARD: [i32; STRING_COUNT] = [-8, -3, 2, 7, 11, 16];

/// MIDI note of the open-string reference pitch C3.
pub(crate) const C3_MIDI: i32 = 48;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Per-string open pitch offsets from C3, low to high.
    pub tuning: [i32; STRING_COUNT],
    pub capo: u8,
    pub bpm: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tuning: E_STANDARD,
            capo: 0,
            bpm: 120.0,
        }
    }
}

pub struct PlaybackSession {
    pub(crate) ctx: AudioContext,
    pub(crate) instrument: Arc<dyn Instrument>,
    pub(crate) config: SessionConfig,
    pub(crate) voices: Mutex<StringVoices>,
    /// Graph time of the next column's onset. Never behind the renderer,
    /// so late scheduling degrades to "play now" instead of the past.
    cursor: Mutex<f64>,
}

impl PlaybackSession {
    pub fn new(ctx: AudioContext, instrument: Arc<dyn Instrument>, config: SessionConfig) -> Self {
        Self {
            ctx,
            instrument,
            config,
            voices: Mutex::new(StringVoices::new()),
            cursor: Mutex::new(0.0),
        }
    }

    pub fn context(&self) -> &AudioContext {
        &self.ctx
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Schedule one column's notes, then pace one beat. Measure lines are
    /// dividers, not beats: they return immediately without scheduling or
    /// sleeping.
    pub async fn play_note_column(&self, window: &ColumnWindow<'_>) -> Result<(), PlaybackError> {
        let col = window.current();
        if col.is_measure_line() {
            return Ok(());
        }

        let onset = self.claim_beat();
        if col.chord_effects.slap {
            let fx = EffectContext {
                ctx: &self.ctx,
                bpm: self.config.bpm,
                when: onset,
                accent: col.chord_effects.accent,
                palm_mute: col.palm_mute.is_muted(),
            };
            let mut voices = self.voices.lock().unwrap();
            effects::slap::play(&fx, &mut voices);
        } else {
            let multiplier = chord_delay_multiplier(self.config.bpm, &col.chord_effects);
            let first = first_sounding_string(&col.chord_effects);
            for string_index in strum_order(&col.chord_effects) {
                if let Some(note) = resolve_string(window, string_index)? {
                    let when = onset + strum_offset(multiplier, first, string_index);
                    debug!(string_index, fret = note.fret, when, "scheduling note");
                    self.play_note(&note, when);
                }
            }
        }

        tokio::time::sleep(Duration::from_secs_f64(60.0 / self.config.bpm)).await;
        Ok(())
    }

    /// Walk a full column sequence from the top.
    pub async fn play_columns(&self, columns: &[Column]) -> Result<(), PlaybackError> {
        info!(columns = columns.len(), bpm = self.config.bpm, "starting playback");
        for index in 0..columns.len() {
            let window = ColumnWindow::around(columns, index);
            self.play_note_column(&window).await?;
        }
        Ok(())
    }

    /// Choke every ringing string immediately.
    pub fn stop_all(&self) {
        let now = self.ctx.current_time();
        self.voices.lock().unwrap().stop_all(now);
    }

    /// Take the next beat slot off the cursor, catching up to the renderer
    /// if it has moved past us.
    fn claim_beat(&self) -> f64 {
        let mut cursor = self.cursor.lock().unwrap();
        let onset = cursor.max(self.ctx.current_time());
        *cursor = onset + 60.0 / self.config.bpm;
        onset
    }

    pub(crate) fn midi_note(&self, string_index: usize, fret: u8) -> i32 {
        C3_MIDI + self.config.tuning[string_index - 1] + self.config.capo as i32 + fret as i32
    }
}

/// Column playback failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    Parse(ParseError),
}

impl From<ParseError> for PlaybackError {
    fn from(err: ParseError) -> Self {
        PlaybackError::Parse(err)
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::Parse(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PlaybackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlaybackError::Parse(err) => Some(err),
        }
    }
}
