//! Fret/token parser
//!
//! Each tab cell is parsed exactly once into a structured `CellToken`; the
//! scheduler dispatches on the token instead of re-matching raw strings.
//! The grammar is a fret number in `[0, 22]` decorated with effect glyphs:
//!
//! ```text
//! h p   hammer-on / pull-off        b r   bend / release
//! / \   slide up / slide down       ~     vibrato
//! > .   accent / staccato           x     dead note
//! ```
//!
//! A glyph may appear without a fret (`"b"`, `"~"`, `"x"`) meaning "apply to
//! the note resolved from a neighboring column". A cell that is nothing but
//! `h`, `p`, `/` or `\` is a continuation placeholder: the beat holds and
//! the actual transition lands on the next populated cell.
//!
//! Malformed cells fail fast with [`ParseError`] rather than flowing a
//! garbage fret into pitch math.

use std::fmt;

/// Highest playable fret; slide and bend targets clamp here.
pub const MAX_FRET: u8 = 22;

/// Direction of a slide glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    Up,
    Down,
}

/// The four glyphs that can stand alone as a continuation placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionGlyph {
    HammerOn,
    PullOff,
    SlideUp,
    SlideDown,
}

/// Which effect glyphs a cell carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphSet {
    pub hammer_on: bool,
    pub pull_off: bool,
    pub slide_up: bool,
    pub slide_down: bool,
    pub bend: bool,
    pub release: bool,
    pub vibrato: bool,
    pub accent: bool,
    pub staccato: bool,
    pub dead: bool,
}

impl GlyphSet {
    pub fn is_empty(&self) -> bool {
        *self == GlyphSet::default()
    }

    fn transition_glyph(&self) -> Option<TransitionGlyph> {
        if self.hammer_on {
            Some(TransitionGlyph::HammerOn)
        } else if self.pull_off {
            Some(TransitionGlyph::PullOff)
        } else if self.slide_up {
            Some(TransitionGlyph::SlideUp)
        } else if self.slide_down {
            Some(TransitionGlyph::SlideDown)
        } else {
            None
        }
    }
}

/// Structural classification of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// No content on this string this beat.
    Empty,
    /// Glyph-only `h`/`p`/`/`/`\`: the pluck happens on the next populated
    /// cell; this beat is not a standalone playable event.
    Continuation(TransitionGlyph),
    /// A playable event. `fret` is `None` for bare-glyph cells whose fret is
    /// inherited from a neighboring column.
    Note { fret: Option<u8> },
}

/// One parsed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellToken {
    pub kind: CellKind,
    pub glyphs: GlyphSet,
    /// Slide glyph written before the fret (`"/3"`): slide into the note.
    pub leading_slide: Option<SlideDirection>,
    /// Slide glyph written after the fret (`"3/"`): slide out of the note,
    /// or a tether marker when the next column carries the destination.
    pub trailing_slide: Option<SlideDirection>,
}

impl CellToken {
    pub fn fret(&self) -> Option<u8> {
        match self.kind {
            CellKind::Note { fret } => fret,
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == CellKind::Empty
    }

    /// The glyph that tethers this note to the next column's note, if any.
    /// Only meaningful on fret-bearing cells (`"3h"`, `"3/"`).
    pub fn tether_marker(&self) -> Option<TransitionGlyph> {
        match self.kind {
            CellKind::Note { fret: Some(_) } => {
                if self.hammer_or_pull() {
                    self.glyphs.transition_glyph()
                } else {
                    self.trailing_slide.map(|dir| match dir {
                        SlideDirection::Up => TransitionGlyph::SlideUp,
                        SlideDirection::Down => TransitionGlyph::SlideDown,
                    })
                }
            }
            _ => None,
        }
    }

    fn hammer_or_pull(&self) -> bool {
        self.glyphs.hammer_on || self.glyphs.pull_off
    }
}

/// Parse one cell. `string_index` (1-6) is carried into errors for
/// diagnostics only.
pub fn parse_cell(cell: &str, string_index: usize) -> Result<CellToken, ParseError> {
    let text = cell.trim();
    if text.is_empty() {
        return Ok(CellToken {
            kind: CellKind::Empty,
            glyphs: GlyphSet::default(),
            leading_slide: None,
            trailing_slide: None,
        });
    }

    let err = |kind: ParseErrorKind| ParseError {
        cell: cell.to_string(),
        string_index,
        kind,
    };

    let mut glyphs = GlyphSet::default();
    let mut leading_slide = None;
    let mut trailing_slide = None;
    let mut digits = String::new();
    let mut digits_done = false;

    for ch in text.chars() {
        match ch {
            '0'..='9' => {
                if digits_done {
                    return Err(err(ParseErrorKind::SplitFretDigits));
                }
                digits.push(ch);
            }
            _ => {
                if !digits.is_empty() {
                    digits_done = true;
                }
                match ch {
                    'h' => glyphs.hammer_on = true,
                    'p' => glyphs.pull_off = true,
                    'b' => glyphs.bend = true,
                    'r' => glyphs.release = true,
                    '~' => glyphs.vibrato = true,
                    '>' => glyphs.accent = true,
                    '.' => glyphs.staccato = true,
                    'x' => glyphs.dead = true,
                    '/' | '\\' => {
                        let dir = if ch == '/' {
                            SlideDirection::Up
                        } else {
                            SlideDirection::Down
                        };
                        if ch == '/' {
                            glyphs.slide_up = true;
                        } else {
                            glyphs.slide_down = true;
                        }
                        if digits.is_empty() {
                            leading_slide = Some(dir);
                        } else {
                            trailing_slide = Some(dir);
                        }
                    }
                    other => return Err(err(ParseErrorKind::UnknownCharacter(other))),
                }
            }
        }
    }

    let fret = if digits.is_empty() {
        None
    } else {
        let value: u32 = digits
            .parse()
            .map_err(|_| err(ParseErrorKind::FretOutOfRange(u32::MAX)))?;
        if value > MAX_FRET as u32 {
            return Err(err(ParseErrorKind::FretOutOfRange(value)));
        }
        Some(value as u8)
    };

    let kind = match fret {
        Some(_) => CellKind::Note { fret },
        None => match glyphs.transition_glyph() {
            Some(glyph) => CellKind::Continuation(glyph),
            None => CellKind::Note { fret: None },
        },
    };

    Ok(CellToken {
        kind,
        glyphs,
        leading_slide,
        trailing_slide,
    })
}

/// A cell whose content cannot be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub cell: String,
    pub string_index: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnknownCharacter(char),
    FretOutOfRange(u32),
    /// Two digit groups in one cell (`"1x2"`).
    SplitFretDigits,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot parse cell {:?} on string {}: ",
            self.cell, self.string_index
        )?;
        match self.kind {
            ParseErrorKind::UnknownCharacter(ch) => write!(f, "unknown character {ch:?}"),
            ParseErrorKind::FretOutOfRange(v) => {
                write!(f, "fret {v} outside 0..={MAX_FRET}")
            }
            ParseErrorKind::SplitFretDigits => write!(f, "more than one fret number"),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fret_extraction_round_trip() {
        // Every {prefix}{fret}{suffix} shape yields exactly the written fret.
        let prefixes = ["", "/", "\\"];
        let suffixes = ["", "h", "p", "/", "\\", "b", "r", "~", "x"];
        for fret in 0..=MAX_FRET {
            for prefix in prefixes {
                for suffix in suffixes {
                    let cell = format!("{prefix}{fret}{suffix}");
                    let token = parse_cell(&cell, 1).unwrap();
                    assert_eq!(token.fret(), Some(fret), "cell {cell:?}");
                }
            }
        }
    }

    #[test]
    fn test_empty_cell() {
        let token = parse_cell("", 3).unwrap();
        assert!(token.is_empty());
        assert_eq!(parse_cell("  ", 3).unwrap().kind, CellKind::Empty);
    }

    #[test]
    fn test_glyph_only_continuation() {
        assert_eq!(
            parse_cell("h", 1).unwrap().kind,
            CellKind::Continuation(TransitionGlyph::HammerOn)
        );
        assert_eq!(
            parse_cell("p", 1).unwrap().kind,
            CellKind::Continuation(TransitionGlyph::PullOff)
        );
        assert_eq!(
            parse_cell("/", 1).unwrap().kind,
            CellKind::Continuation(TransitionGlyph::SlideUp)
        );
        assert_eq!(
            parse_cell("\\", 1).unwrap().kind,
            CellKind::Continuation(TransitionGlyph::SlideDown)
        );
    }

    #[test]
    fn test_bare_glyphs_are_inheriting_notes() {
        for cell in ["b", "r", "~", "x"] {
            let token = parse_cell(cell, 2).unwrap();
            assert_eq!(token.kind, CellKind::Note { fret: None }, "cell {cell:?}");
        }
        assert!(parse_cell("r", 2).unwrap().glyphs.release);
        assert!(parse_cell("x", 2).unwrap().glyphs.dead);
    }

    #[test]
    fn test_leading_vs_trailing_slide() {
        let pre = parse_cell("/3", 1).unwrap();
        assert_eq!(pre.leading_slide, Some(SlideDirection::Up));
        assert_eq!(pre.trailing_slide, None);
        assert_eq!(pre.fret(), Some(3));

        let post = parse_cell("3/", 1).unwrap();
        assert_eq!(post.leading_slide, None);
        assert_eq!(post.trailing_slide, Some(SlideDirection::Up));

        let down = parse_cell("7\\", 1).unwrap();
        assert_eq!(down.trailing_slide, Some(SlideDirection::Down));
    }

    #[test]
    fn test_tether_marker() {
        assert_eq!(
            parse_cell("3h", 1).unwrap().tether_marker(),
            Some(TransitionGlyph::HammerOn)
        );
        assert_eq!(
            parse_cell("5/", 1).unwrap().tether_marker(),
            Some(TransitionGlyph::SlideUp)
        );
        assert_eq!(parse_cell("5b", 1).unwrap().tether_marker(), None);
        assert_eq!(parse_cell("5", 1).unwrap().tether_marker(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_cell("3q", 1).unwrap_err().kind,
            ParseErrorKind::UnknownCharacter('q')
        ));
        assert!(matches!(
            parse_cell("23", 1).unwrap_err().kind,
            ParseErrorKind::FretOutOfRange(23)
        ));
        assert!(matches!(
            parse_cell("1x2", 1).unwrap_err().kind,
            ParseErrorKind::SplitFretDigits
        ));
    }

    #[test]
    fn test_combined_glyphs() {
        let token = parse_cell("12b~", 4).unwrap();
        assert_eq!(token.fret(), Some(12));
        assert!(token.glyphs.bend);
        assert!(token.glyphs.vibrato);
    }
}
