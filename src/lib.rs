//! # Tabstrum - Guitar Tab Playback Engine
//!
//! Tabstrum turns guitar tablature columns into scheduled audio: it walks a
//! tab one column per beat, resolves each string's cell against its
//! neighboring columns, and emulates playing technique on a small
//! Web-Audio-shaped graph.
//!
//! ## Core Features
//!
//! - **Column Walking**: one beat per column, measure lines skipped for free
//! - **Technique Emulation**: bends, releases, hammer-ons, pull-offs,
//!   slides, vibrato, palm mutes, dead notes, accents, staccato, slap
//! - **Per-String Voices**: each string rings at most one voice; legato
//!   effects splice the ringing voice instead of re-plucking
//! - **Sample-Accurate Scheduling**: onsets, stops and pitch ramps carry
//!   absolute timestamps, so strum spreads and bends land exactly
//! - **Instruments**: a Karplus-Strong pluck model out of the box, or a
//!   repitching sample bank loaded from WAV files
//! - **Offline Rendering**: drive the graph without a device and write WAV
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tabstrum::{
//!     render_to_buffer, AudioContext, Column, PlaybackSession, PluckedInstrument,
//!     RenderConfig, SessionConfig,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tabstrum::PlaybackError> {
//! let ctx = AudioContext::new(44100.0);
//! let session = PlaybackSession::new(
//!     ctx.clone(),
//!     Arc::new(PluckedInstrument::new(44100.0)),
//!     SessionConfig::default(),
//! );
//!
//! // Two beats: pluck the 3rd fret on the B string, then bend it up.
//! let columns: Vec<Column> = serde_json::from_str(
//!     r#"[["", "", "", "", "", "3", "", "", "1/4th", "c1"],
//!         ["", "", "", "", "", "b", "", "", "1/4th", "c2"]]"#,
//! )
//! .unwrap();
//!
//! session.play_columns(&columns).await?;
//! let audio = render_to_buffer(&ctx, 2.0, &RenderConfig::default());
//! assert!(audio.iter().any(|s| s.abs() > 0.01));
//! # Ok(())
//! # }
//! ```
//!
//! Real-time playback goes through [`AudioOutput::open`], which hands back
//! the same [`AudioContext`] wired to a cpal stream.

pub mod audio;
pub mod audio_graph;
pub mod cell;
pub mod column_window;
pub mod effects;
pub mod nodes;
mod player;
pub mod render;
pub mod resolve;
pub mod sampler;
pub mod session;
pub mod tab;
pub mod voices;

pub use audio::AudioOutput;
pub use audio_graph::{AudioContext, AudioNode, NodeId, Param, ParamKind};
pub use cell::{parse_cell, CellKind, CellToken, ParseError, MAX_FRET};
pub use column_window::ColumnWindow;
pub use render::{render_to_buffer, render_to_wav, RenderConfig, RenderStats};
pub use resolve::{resolve_string, NoteEffects, ResolvedNote, Transition, TransitionKind};
pub use sampler::{Instrument, PlayOptions, PluckedInstrument, SampleBankInstrument, SampleRef};
pub use session::{PlaybackError, PlaybackSession, SessionConfig, E_STANDARD};
pub use tab::{
    ChordEffects, Column, NoteLength, PalmMuteState, StrumDirection, TabDataError, STRING_COUNT,
};
pub use voices::{StringVoices, Voice};
