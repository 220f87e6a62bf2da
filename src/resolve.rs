//! Per-string note resolution
//!
//! Walks the five-column window and turns one string's cell into a
//! [`ResolvedNote`]: the sounding fret, the effect flags, and the derived
//! transition descriptor (tether, bend, release or arbitrary slide). All
//! pure; the audio side consumes the output without re-reading columns.
//!
//! The strum plan (iteration order and per-string timing stagger) also
//! lives here so the scheduler's branching stays testable without audio.

use crate::cell::{parse_cell, CellKind, CellToken, ParseError, SlideDirection, TransitionGlyph};
use crate::column_window::ColumnWindow;
use crate::tab::{ChordEffects, StrumDirection, STRING_COUNT};
use tracing::debug;

/// Fret clamp range for implicit bend/slide targets.
fn clamp_fret(fret: i32) -> u8 {
    fret.clamp(0, crate::cell::MAX_FRET as i32) as u8
}

/// Kind of pitch transition attached to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    HammerOn,
    PullOff,
    SlideUp,
    SlideDown,
    Bend,
    Release,
    /// Slide with an implicit target (±2 frets) instead of a neighboring
    /// column's note. Pre-note when `from_fret` differs from the sounding
    /// fret, post-note when it equals it.
    ArbitrarySlide,
}

impl From<TransitionGlyph> for TransitionKind {
    fn from(glyph: TransitionGlyph) -> Self {
        match glyph {
            TransitionGlyph::HammerOn => TransitionKind::HammerOn,
            TransitionGlyph::PullOff => TransitionKind::PullOff,
            TransitionGlyph::SlideUp => TransitionKind::SlideUp,
            TransitionGlyph::SlideDown => TransitionKind::SlideDown,
        }
    }
}

/// Derived transition descriptor. Computed fresh per scheduling call, never
/// stored in the tab data.
///
/// The note's buffer sounds at [`ResolvedNote::fret`]; the detune ramp runs
/// from `from_fret` to `to_fret` relative to that pitch (100 cents per fret).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub from_fret: u8,
    pub to_fret: u8,
    /// False when the base note must not be freshly plucked (continuation
    /// of a ringing voice).
    pub pluck: bool,
}

/// Effect flags applying to one resolved note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteEffects {
    pub accent: bool,
    pub staccato: bool,
    pub vibrato: bool,
    pub palm_mute: bool,
    pub dead: bool,
}

/// One string's fully resolved playable event for the current column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedNote {
    /// Raw-record string index, 1-6.
    pub string_index: usize,
    /// Fret the voice's buffer is pitched at.
    pub fret: u8,
    /// False for continuations that keep the ringing voice alive.
    pub pluck: bool,
    pub effects: NoteEffects,
    pub transition: Option<Transition>,
    /// Bend target chained onto a tether, starting when its ramp completes.
    pub chained_bend: Option<u8>,
}

fn token_at(
    window: &ColumnWindow<'_>,
    offset: i32,
    string_index: usize,
) -> Result<Option<CellToken>, ParseError> {
    match window.at(offset) {
        Some(col) => Ok(Some(parse_cell(col.fret_cell(string_index), string_index)?)),
        None => Ok(None),
    }
}

/// Bend target for a bend written at `bend_offset`: the column after it may
/// carry the target as a bare number; otherwise one whole step up, clamped.
fn bend_target(
    window: &ColumnWindow<'_>,
    bend_offset: i32,
    base: u8,
    string_index: usize,
) -> Result<u8, ParseError> {
    if let Some(token) = token_at(window, bend_offset + 1, string_index)? {
        if token.glyphs.is_empty() {
            if let Some(target) = token.fret() {
                return Ok(target);
            }
        }
    }
    Ok(clamp_fret(base as i32 + 2))
}

/// Tether source for the current note: either the previous column carries a
/// fret with a trailing marker (`"3h"`), or it is a glyph-only placeholder
/// and the fret sits two columns back.
fn tether_from_prev(
    prev: Option<&CellToken>,
    second_prev: Option<&CellToken>,
) -> Option<(TransitionKind, u8)> {
    let prev = prev?;
    if let (Some(glyph), Some(source)) = (prev.tether_marker(), prev.fret()) {
        return Some((glyph.into(), source));
    }
    if let CellKind::Continuation(glyph) = prev.kind {
        let source = second_prev.and_then(|t| t.fret())?;
        return Some((glyph.into(), source));
    }
    None
}

fn inherited_fret(prev: Option<&CellToken>, second_prev: Option<&CellToken>) -> Option<u8> {
    prev.and_then(|t| t.fret())
        .or_else(|| second_prev.and_then(|t| t.fret()))
}

/// Resolve one string of the current column. `Ok(None)` means nothing
/// sounds on this string this beat.
pub fn resolve_string(
    window: &ColumnWindow<'_>,
    string_index: usize,
) -> Result<Option<ResolvedNote>, ParseError> {
    debug_assert!((1..=STRING_COUNT).contains(&string_index));

    let col = window.current();
    let token = parse_cell(col.fret_cell(string_index), string_index)?;

    let fret = match token.kind {
        CellKind::Empty | CellKind::Continuation(_) => return Ok(None),
        CellKind::Note { fret } => fret,
    };

    let chord = &col.chord_effects;
    let effects = NoteEffects {
        accent: token.glyphs.accent || chord.accent,
        staccato: token.glyphs.staccato || chord.staccato,
        vibrato: token.glyphs.vibrato || chord.vibrato,
        palm_mute: col.palm_mute.is_muted(),
        dead: token.glyphs.dead,
    };

    let prev = token_at(window, -1, string_index)?;
    let second_prev = token_at(window, -2, string_index)?;

    // Tethered transition landing on this column.
    if let Some(dest) = fret {
        if let Some((kind, source)) = tether_from_prev(prev.as_ref(), second_prev.as_ref()) {
            let chained_bend = if token.glyphs.bend {
                Some(bend_target(window, 0, dest, string_index)?)
            } else {
                None
            };
            return Ok(Some(ResolvedNote {
                string_index,
                fret: dest,
                pluck: false,
                effects,
                transition: Some(Transition {
                    kind,
                    from_fret: source,
                    to_fret: dest,
                    pluck: false,
                }),
                chained_bend,
            }));
        }
    }

    if token.glyphs.release {
        // Pair with a bend up to two columns back; the release returns the
        // detuned voice to the base pitch without a fresh pluck.
        let ancestor = [(-1, prev.as_ref()), (-2, second_prev.as_ref())]
            .into_iter()
            .find_map(|(offset, t)| {
                t.filter(|t| t.glyphs.bend).map(|t| (offset, *t))
            });
        if let Some((offset, bend)) = ancestor {
            let Some(base) = bend.fret().or(fret) else {
                return Ok(None);
            };
            let bent = bend_target(window, offset, base, string_index)?;
            return Ok(Some(ResolvedNote {
                string_index,
                fret: base,
                pluck: false,
                effects,
                transition: Some(Transition {
                    kind: TransitionKind::Release,
                    from_fret: bent,
                    to_fret: base,
                    pluck: false,
                }),
                chained_bend: None,
            }));
        }
        if let Some(f) = fret {
            // No bend to release from, but an explicit fret: plucked note
            // bending down a whole step, floored at the nut.
            return Ok(Some(ResolvedNote {
                string_index,
                fret: f,
                pluck: true,
                effects,
                transition: Some(Transition {
                    kind: TransitionKind::Release,
                    from_fret: f,
                    to_fret: clamp_fret(f as i32 - 2),
                    pluck: true,
                }),
                chained_bend: None,
            }));
        }
        debug!(string_index, "release without bend ancestor, dropping");
        return Ok(None);
    }

    if token.glyphs.bend {
        let Some(base) = fret.or_else(|| inherited_fret(prev.as_ref(), second_prev.as_ref()))
        else {
            debug!(string_index, "bend with no resolvable base fret, dropping");
            return Ok(None);
        };
        let target = bend_target(window, 0, base, string_index)?;
        // A matching bend one or two columns back means the string is still
        // ringing through a bend-hold-release chain; no fresh pluck.
        let chained = [prev.as_ref(), second_prev.as_ref()]
            .into_iter()
            .flatten()
            .any(|t| t.glyphs.bend && t.fret() == Some(base));
        let pluck = fret.is_some() && !chained;
        return Ok(Some(ResolvedNote {
            string_index,
            fret: base,
            pluck,
            effects,
            transition: Some(Transition {
                kind: TransitionKind::Bend,
                from_fret: base,
                to_fret: target,
                pluck,
            }),
            chained_bend: None,
        }));
    }

    // A bare number right after a bend is that bend's target hold; the ramp
    // scheduled on the previous beat already sounds it.
    if fret.is_some()
        && token.glyphs.is_empty()
        && prev.as_ref().is_some_and(|t| t.glyphs.bend)
    {
        return Ok(None);
    }

    if let (Some(dir), Some(f)) = (token.leading_slide, fret) {
        // Pre-note arbitrary slide: pluck offset from the written fret and
        // ramp into it.
        let from = match dir {
            SlideDirection::Up => clamp_fret(f as i32 - 2),
            SlideDirection::Down => clamp_fret(f as i32 + 2),
        };
        return Ok(Some(ResolvedNote {
            string_index,
            fret: f,
            pluck: true,
            effects,
            transition: Some(Transition {
                kind: TransitionKind::ArbitrarySlide,
                from_fret: from,
                to_fret: f,
                pluck: true,
            }),
            chained_bend: None,
        }));
    }

    if let (Some(dir), Some(f)) = (token.trailing_slide, fret) {
        let next_has_note = token_at(window, 1, string_index)?
            .is_some_and(|t| t.fret().is_some());
        if !next_has_note {
            // Post-note arbitrary slide: normal pluck, ramp away afterwards.
            let to = match dir {
                SlideDirection::Up => clamp_fret(f as i32 + 2),
                SlideDirection::Down => clamp_fret(f as i32 - 2),
            };
            return Ok(Some(ResolvedNote {
                string_index,
                fret: f,
                pluck: true,
                effects,
                transition: Some(Transition {
                    kind: TransitionKind::ArbitrarySlide,
                    from_fret: f,
                    to_fret: to,
                    pluck: true,
                }),
                chained_bend: None,
            }));
        }
        // Tether marker: the transition is scheduled when the next column
        // plays; this beat the note sounds plain.
    }

    match fret {
        Some(f) => Ok(Some(ResolvedNote {
            string_index,
            fret: f,
            pluck: true,
            effects,
            transition: None,
            chained_bend: None,
        })),
        None if effects.dead => {
            // Bare dead strike: pitch is irrelevant through the mute chain,
            // fall back to the open string when nothing rings nearby.
            let f = inherited_fret(prev.as_ref(), second_prev.as_ref()).unwrap_or(0);
            Ok(Some(ResolvedNote {
                string_index,
                fret: f,
                pluck: true,
                effects,
                transition: None,
                chained_bend: None,
            }))
        }
        None => {
            // Bare vibrato/accent glyph: applies to the note still ringing
            // from a neighboring column.
            match inherited_fret(prev.as_ref(), second_prev.as_ref()) {
                Some(f) => Ok(Some(ResolvedNote {
                    string_index,
                    fret: f,
                    pluck: false,
                    effects,
                    transition: None,
                    chained_bend: None,
                })),
                None => Ok(None),
            }
        }
    }
}

/// Seconds of stagger between adjacent strings in a strummed chord: zero
/// without a strum direction, otherwise shrinking with tempo toward a 10 ms
/// floor, and halved for accented or staccato strums (a quicker hand).
pub fn chord_delay_multiplier(bpm: f64, chord: &ChordEffects) -> f64 {
    if chord.strum.is_none() {
        return 0.0;
    }
    let base = 0.01 + 0.045 * (60.0 / bpm);
    if chord.accent || chord.staccato {
        base / 2.0
    } else {
        base
    }
}

/// First string to sound for the column's strum direction.
pub fn first_sounding_string(chord: &ChordEffects) -> usize {
    match chord.strum {
        Some(StrumDirection::Up) => STRING_COUNT,
        _ => 1,
    }
}

/// String indices 1-6 in first-to-sound order.
pub fn strum_order(chord: &ChordEffects) -> [usize; STRING_COUNT] {
    match chord.strum {
        Some(StrumDirection::Up) => [6, 5, 4, 3, 2, 1],
        _ => [1, 2, 3, 4, 5, 6],
    }
}

/// Audible onset offset for one string within a strummed chord.
pub fn strum_offset(multiplier: f64, first_string: usize, string_index: usize) -> f64 {
    multiplier * (first_string as f64 - string_index as f64).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab::{Column, NoteLength, PalmMuteState};

    fn col(cells: [&str; STRING_COUNT]) -> Column {
        Column::new(
            PalmMuteState::None,
            cells.map(|s| s.to_string()),
            ChordEffects::default(),
            NoteLength::Quarter,
            "",
        )
    }

    fn string2(cell: &str) -> Column {
        col(["", cell, "", "", "", ""])
    }

    fn resolve_seq(cells: &[&str]) -> Option<ResolvedNote> {
        let cols: Vec<Column> = cells.iter().map(|c| string2(c)).collect();
        let window = ColumnWindow::around(&cols, cols.len() - 1);
        resolve_string(&window, 2).unwrap()
    }

    #[test]
    fn test_plain_note() {
        let note = resolve_seq(&["3"]).unwrap();
        assert_eq!(note.fret, 3);
        assert!(note.pluck);
        assert!(note.transition.is_none());
        assert_eq!(note.effects, NoteEffects::default());
    }

    #[test]
    fn test_empty_and_continuation_skip() {
        assert!(resolve_seq(&[""]).is_none());
        assert!(resolve_seq(&["3", "h"]).is_none());
        assert!(resolve_seq(&["3", "/"]).is_none());
    }

    #[test]
    fn test_bend_implicit_target_clamps_at_22() {
        let note = resolve_seq(&["21b"]).unwrap();
        let t = note.transition.unwrap();
        assert_eq!(t.kind, TransitionKind::Bend);
        assert_eq!(t.from_fret, 21);
        assert_eq!(t.to_fret, 22);
    }

    #[test]
    fn test_bend_explicit_target_from_next_column() {
        let cols = vec![string2("3b"), string2("5")];
        let window = ColumnWindow::around(&cols, 0);
        let note = resolve_string(&window, 2).unwrap().unwrap();
        assert_eq!(note.transition.unwrap().to_fret, 5);
        assert!(note.pluck);

        // The target-hold column itself does not re-pluck.
        let hold = ColumnWindow::around(&cols, 1);
        assert!(resolve_string(&hold, 2).unwrap().is_none());
    }

    #[test]
    fn test_repluck_suppressed_for_matching_bend_chain() {
        let note = resolve_seq(&["3b", "5", "3b"]).unwrap();
        assert!(!note.pluck);
        assert!(!note.transition.unwrap().pluck);
    }

    #[test]
    fn test_repluck_kept_for_mismatched_bend_chain() {
        let note = resolve_seq(&["3b", "5", "4b"]).unwrap();
        assert!(note.pluck);
        assert!(note.transition.unwrap().pluck);
    }

    #[test]
    fn test_release_pairs_with_bend() {
        let note = resolve_seq(&["3b", "5", "r"]).unwrap();
        assert!(!note.pluck);
        assert_eq!(note.fret, 3);
        let t = note.transition.unwrap();
        assert_eq!(t.kind, TransitionKind::Release);
        assert_eq!(t.from_fret, 5);
        assert_eq!(t.to_fret, 3);
    }

    #[test]
    fn test_release_without_bend_is_dropped() {
        assert!(resolve_seq(&["", "", "r"]).is_none());
    }

    #[test]
    fn test_standalone_release_floor_at_zero() {
        let note = resolve_seq(&["1r"]).unwrap();
        let t = note.transition.unwrap();
        assert_eq!(t.from_fret, 1);
        assert_eq!(t.to_fret, 0);
        assert!(note.pluck);
    }

    #[test]
    fn test_hammer_on_tether() {
        let note = resolve_seq(&["3h", "5"]).unwrap();
        assert_eq!(note.fret, 5);
        assert!(!note.pluck);
        let t = note.transition.unwrap();
        assert_eq!(t.kind, TransitionKind::HammerOn);
        assert_eq!(t.from_fret, 3);
        assert_eq!(t.to_fret, 5);
    }

    #[test]
    fn test_tether_through_placeholder() {
        let note = resolve_seq(&["3", "p", "1"]).unwrap();
        let t = note.transition.unwrap();
        assert_eq!(t.kind, TransitionKind::PullOff);
        assert_eq!(t.from_fret, 3);
        assert_eq!(t.to_fret, 1);
    }

    #[test]
    fn test_slide_tether() {
        let note = resolve_seq(&["3/", "7"]).unwrap();
        let t = note.transition.unwrap();
        assert_eq!(t.kind, TransitionKind::SlideUp);
        assert_eq!(t.from_fret, 3);
        assert_eq!(t.to_fret, 7);
    }

    #[test]
    fn test_pre_note_arbitrary_slide() {
        let note = resolve_seq(&["/3"]).unwrap();
        let t = note.transition.unwrap();
        assert_eq!(t.kind, TransitionKind::ArbitrarySlide);
        assert_eq!(t.from_fret, 1);
        assert_eq!(t.to_fret, 3);
        assert!(note.pluck);

        // Clamped at the nut.
        let low = resolve_seq(&["/1"]).unwrap().transition.unwrap();
        assert_eq!(low.from_fret, 0);
    }

    #[test]
    fn test_post_note_arbitrary_slide() {
        let note = resolve_seq(&["21/"]).unwrap();
        let t = note.transition.unwrap();
        assert_eq!(t.kind, TransitionKind::ArbitrarySlide);
        assert_eq!(t.from_fret, 21);
        assert_eq!(t.to_fret, 22);

        let down = resolve_seq(&["1\\"]).unwrap().transition.unwrap();
        assert_eq!(down.to_fret, 0);
    }

    #[test]
    fn test_bare_vibrato_rides_ringing_note() {
        let note = resolve_seq(&["7", "~"]).unwrap();
        assert_eq!(note.fret, 7);
        assert!(!note.pluck);
        assert!(note.effects.vibrato);
        assert!(note.transition.is_none());
    }

    #[test]
    fn test_dead_note_flags() {
        let note = resolve_seq(&["x"]).unwrap();
        assert!(note.effects.dead);
        assert!(note.pluck);
        assert_eq!(note.fret, 0);
    }

    #[test]
    fn test_palm_mute_and_chord_flags_collected() {
        let mut column = string2("3");
        column.palm_mute = PalmMuteState::Continue;
        column.chord_effects = ChordEffects::parse(">~");
        let window = ColumnWindow::of(&column);
        let note = resolve_string(&window, 2).unwrap().unwrap();
        assert!(note.effects.palm_mute);
        assert!(note.effects.accent);
        assert!(note.effects.vibrato);
    }

    #[test]
    fn test_parse_error_propagates() {
        assert!(resolve_seq_err(&["3z"]));
    }

    fn resolve_seq_err(cells: &[&str]) -> bool {
        let cols: Vec<Column> = cells.iter().map(|c| string2(c)).collect();
        let window = ColumnWindow::around(&cols, cols.len() - 1);
        resolve_string(&window, 2).is_err()
    }

    #[test]
    fn test_chord_delay_multiplier() {
        let none = ChordEffects::default();
        assert_eq!(chord_delay_multiplier(120.0, &none), 0.0);

        let down = ChordEffects::parse("v");
        let slow = chord_delay_multiplier(60.0, &down);
        let fast = chord_delay_multiplier(240.0, &down);
        assert!(slow > fast);
        assert!(fast > 0.01);

        let accented = ChordEffects::parse("v>");
        assert!((chord_delay_multiplier(120.0, &accented) * 2.0
            - chord_delay_multiplier(120.0, &down))
        .abs()
            < 1e-12);
    }

    #[test]
    fn test_strum_offsets_monotonic() {
        let down = ChordEffects::parse("v");
        let mult = chord_delay_multiplier(120.0, &down);
        let first = first_sounding_string(&down);
        let offsets: Vec<f64> = (1..=6).map(|s| strum_offset(mult, first, s)).collect();
        assert!(offsets.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(offsets[0], 0.0);

        let up = ChordEffects::parse("^");
        let mult = chord_delay_multiplier(120.0, &up);
        let first = first_sounding_string(&up);
        let offsets: Vec<f64> = (1..=6).map(|s| strum_offset(mult, first, s)).collect();
        assert!(offsets.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(offsets[5], 0.0);
    }

    #[test]
    fn test_strum_order_matches_direction() {
        assert_eq!(strum_order(&ChordEffects::parse("v"))[0], 1);
        assert_eq!(strum_order(&ChordEffects::parse("^"))[0], 6);
        assert_eq!(strum_order(&ChordEffects::default())[0], 1);
    }
}
