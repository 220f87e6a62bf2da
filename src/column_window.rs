//! Fixed five-column scheduling window
//!
//! Tethered effects and bend/release pairing need up to three columns of
//! look-back, and bend targets one column of look-ahead. Rather than
//! threading four optional parameters through the scheduler, the window is
//! an explicit bounds-checked cursor over `{-3, -2, -1, 0, +1}`.

use crate::tab::Column;

/// Borrowed view of the five columns around the one being scheduled.
/// Only `current` (offset 0) is guaranteed present; the rest are absent at
/// section boundaries.
#[derive(Debug, Clone, Copy)]
pub struct ColumnWindow<'a> {
    // [third_prev, second_prev, prev, current, next]
    slots: [Option<&'a Column>; 5],
}

impl<'a> ColumnWindow<'a> {
    pub fn new(
        third_prev: Option<&'a Column>,
        second_prev: Option<&'a Column>,
        prev: Option<&'a Column>,
        current: &'a Column,
        next: Option<&'a Column>,
    ) -> Self {
        Self {
            slots: [third_prev, second_prev, prev, Some(current), next],
        }
    }

    /// A window with no context, for isolated columns.
    pub fn of(current: &'a Column) -> Self {
        Self::new(None, None, None, current, None)
    }

    /// Build the window around `columns[index]`. Measure-line columns carry
    /// no note data, so they are skipped when picking neighbors; a bar
    /// divider must not shadow the bend/tether look-back.
    pub fn around(columns: &'a [Column], index: usize) -> Self {
        let mut lookback = columns[..index]
            .iter()
            .rev()
            .filter(|col| !col.is_measure_line());
        let prev = lookback.next();
        let second_prev = lookback.next();
        let third_prev = lookback.next();
        let next = columns[index + 1..]
            .iter()
            .find(|col| !col.is_measure_line());
        Self {
            slots: [third_prev, second_prev, prev, Some(&columns[index]), next],
        }
    }

    pub fn current(&self) -> &'a Column {
        self.slots[3].expect("window always holds a current column")
    }

    /// Column at `offset` beats from current, for `offset` in `-3..=1`.
    /// Out-of-range offsets and absent neighbors both yield `None`.
    pub fn at(&self, offset: i32) -> Option<&'a Column> {
        if !(-3..=1).contains(&offset) {
            return None;
        }
        self.slots[(offset + 3) as usize]
    }
}
