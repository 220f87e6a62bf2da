//! Tab column data model
//!
//! A tab is a sequence of columns, one per beat slot. Each column is stored
//! upstream as a flat 10-field string array:
//!
//! ```text
//! [palm mute, string 1, ..., string 6, chord effects, note length, id]
//! ```
//!
//! This module gives that record a typed shape. Columns are read-only input
//! to the engine; nothing here is mutated during playback.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of strings on the instrument.
pub const STRING_COUNT: usize = 6;

/// Palm-mute span membership for a column (index 0 of the raw record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PalmMuteState {
    /// Not inside a palm-mute span
    #[default]
    None,
    /// First column of a span
    Start,
    /// Interior column of a span
    Continue,
    /// Last column of a span
    End,
}

impl PalmMuteState {
    pub fn parse(text: &str) -> Result<Self, TabDataError> {
        match text {
            "" => Ok(PalmMuteState::None),
            "start" => Ok(PalmMuteState::Start),
            "-" => Ok(PalmMuteState::Continue),
            "end" => Ok(PalmMuteState::End),
            other => Err(TabDataError::PalmMute(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PalmMuteState::None => "",
            PalmMuteState::Start => "start",
            PalmMuteState::Continue => "-",
            PalmMuteState::End => "end",
        }
    }

    /// Any span membership means the column's notes are palm-muted.
    pub fn is_muted(self) -> bool {
        self != PalmMuteState::None
    }
}

/// Note length tag for a column (index 8 of the raw record).
///
/// `MeasureLine` marks a bar divider: the column carries no playable note
/// data and the scheduler skips it without consuming a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteLength {
    Quarter,
    Eighth,
    Sixteenth,
    QuarterTriplet,
    EighthTriplet,
    SixteenthTriplet,
    MeasureLine,
}

impl NoteLength {
    pub fn parse(tag: &str) -> Result<Self, TabDataError> {
        match tag {
            "1/4th" => Ok(NoteLength::Quarter),
            "1/8th" => Ok(NoteLength::Eighth),
            "1/16th" => Ok(NoteLength::Sixteenth),
            "1/4th triplet" => Ok(NoteLength::QuarterTriplet),
            "1/8th triplet" => Ok(NoteLength::EighthTriplet),
            "1/16th triplet" => Ok(NoteLength::SixteenthTriplet),
            "measureLine" => Ok(NoteLength::MeasureLine),
            other => Err(TabDataError::NoteLength(other.to_string())),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            NoteLength::Quarter => "1/4th",
            NoteLength::Eighth => "1/8th",
            NoteLength::Sixteenth => "1/16th",
            NoteLength::QuarterTriplet => "1/4th triplet",
            NoteLength::EighthTriplet => "1/8th triplet",
            NoteLength::SixteenthTriplet => "1/16th triplet",
            NoteLength::MeasureLine => "measureLine",
        }
    }

    /// Length as a fraction of a quarter-note beat. Callers that want
    /// shorter columns to pass faster pre-scale the tempo with this; the
    /// scheduler itself always paces one fixed beat per column.
    pub fn beats(self) -> f64 {
        match self {
            NoteLength::Quarter => 1.0,
            NoteLength::Eighth => 0.5,
            NoteLength::Sixteenth => 0.25,
            NoteLength::QuarterTriplet => 2.0 / 3.0,
            NoteLength::EighthTriplet => 1.0 / 3.0,
            NoteLength::SixteenthTriplet => 1.0 / 6.0,
            NoteLength::MeasureLine => 0.0,
        }
    }
}

/// Direction of a strummed chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrumDirection {
    /// `v` - low strings sound first
    Down,
    /// `^` - high strings sound first
    Up,
}

/// Chord-level effect flags (index 7 of the raw record).
///
/// The field is a free-text token set; any combination of `>` (accent),
/// `.` (staccato), `v`/`^` (strum direction), `s` (slap) and `~` (vibrato)
/// may be present. Unknown characters are ignored, matching the lenient
/// editor that produces the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChordEffects {
    pub accent: bool,
    pub staccato: bool,
    pub slap: bool,
    pub vibrato: bool,
    pub strum: Option<StrumDirection>,
}

impl ChordEffects {
    pub fn parse(text: &str) -> Self {
        let mut fx = ChordEffects::default();
        for ch in text.chars() {
            match ch {
                '>' => fx.accent = true,
                '.' => fx.staccato = true,
                's' => fx.slap = true,
                '~' => fx.vibrato = true,
                'v' => fx.strum = Some(StrumDirection::Down),
                '^' => fx.strum = Some(StrumDirection::Up),
                _ => {}
            }
        }
        fx
    }

    /// Canonical token rendering, used when serializing back to the raw shape.
    pub fn to_token_string(self) -> String {
        let mut out = String::new();
        if self.accent {
            out.push('>');
        }
        if self.staccato {
            out.push('.');
        }
        match self.strum {
            Some(StrumDirection::Down) => out.push('v'),
            Some(StrumDirection::Up) => out.push('^'),
            None => {}
        }
        if self.slap {
            out.push('s');
        }
        if self.vibrato {
            out.push('~');
        }
        out
    }
}

/// One beat slot across all six strings plus chord-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawColumn", into = "RawColumn")]
pub struct Column {
    pub palm_mute: PalmMuteState,
    frets: [String; STRING_COUNT],
    pub chord_effects: ChordEffects,
    pub note_length: NoteLength,
    pub id: String,
}

/// The flat array shape used by the surrounding application.
type RawColumn = [String; 10];

impl Column {
    pub fn new(
        palm_mute: PalmMuteState,
        frets: [String; STRING_COUNT],
        chord_effects: ChordEffects,
        note_length: NoteLength,
        id: impl Into<String>,
    ) -> Self {
        Self {
            palm_mute,
            frets,
            chord_effects,
            note_length,
            id: id.into(),
        }
    }

    /// A column with no notes and no effects.
    pub fn empty(note_length: NoteLength) -> Self {
        Self {
            palm_mute: PalmMuteState::None,
            frets: Default::default(),
            chord_effects: ChordEffects::default(),
            note_length,
            id: String::new(),
        }
    }

    /// A bar-divider column.
    pub fn measure_line() -> Self {
        Self::empty(NoteLength::MeasureLine)
    }

    pub fn from_cells(cells: RawColumn) -> Result<Self, TabDataError> {
        let [palm, s1, s2, s3, s4, s5, s6, chord, length, id] = cells;
        Ok(Self {
            palm_mute: PalmMuteState::parse(&palm)?,
            frets: [s1, s2, s3, s4, s5, s6],
            chord_effects: ChordEffects::parse(&chord),
            note_length: NoteLength::parse(&length)?,
            id,
        })
    }

    /// Cell text for a string. `string_index` uses the raw-record indexing,
    /// 1 through 6.
    pub fn fret_cell(&self, string_index: usize) -> &str {
        assert!(
            (1..=STRING_COUNT).contains(&string_index),
            "string index {string_index} out of range 1..=6"
        );
        &self.frets[string_index - 1]
    }

    /// True when no string carries any cell content.
    pub fn has_no_notes(&self) -> bool {
        self.frets.iter().all(|cell| cell.is_empty())
    }

    pub fn is_measure_line(&self) -> bool {
        self.note_length == NoteLength::MeasureLine
    }
}

impl TryFrom<RawColumn> for Column {
    type Error = TabDataError;

    fn try_from(cells: RawColumn) -> Result<Self, Self::Error> {
        Column::from_cells(cells)
    }
}

impl From<Column> for RawColumn {
    fn from(col: Column) -> Self {
        let [s1, s2, s3, s4, s5, s6] = col.frets;
        [
            col.palm_mute.as_str().to_string(),
            s1,
            s2,
            s3,
            s4,
            s5,
            s6,
            col.chord_effects.to_token_string(),
            col.note_length.tag().to_string(),
            col.id,
        ]
    }
}

/// Malformed column metadata (palm-mute or note-length tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabDataError {
    PalmMute(String),
    NoteLength(String),
}

impl fmt::Display for TabDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabDataError::PalmMute(tag) => write!(f, "unknown palm mute tag {tag:?}"),
            TabDataError::NoteLength(tag) => write!(f, "unknown note length tag {tag:?}"),
        }
    }
}

impl std::error::Error for TabDataError {}
