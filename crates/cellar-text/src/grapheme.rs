// SPDX-License-Identifier: MIT
//
// Grapheme cluster boundaries over codepoint cells.
//
// Storage is one codepoint per cell, but the cursor moves by what the user
// sees as a character: a flag is two regional indicators, a family emoji is
// several people joined by U+200D, an accented letter may be a base plus a
// combining mark. Boundaries follow the extended grapheme cluster rules of
// UAX #29 via `unicode-segmentation`.
//
// The segmenter runs over a bounded window of cells around the cursor,
// never the whole line. No real cluster is longer than MAX_CLUSTER_CELLS,
// so a window of that size always contains the cluster being stepped over.
// The one rule that looks further back is regional-indicator pairing, which
// depends on the parity of the whole run; the backward window is stretched
// to the start of such a run.

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::cell::Cell;

/// Upper bound on the number of codepoints in one cluster.
pub const MAX_CLUSTER_CELLS: usize = 32;

/// Whether `ch` is a regional indicator symbol (half of a flag).
#[inline]
#[must_use]
pub const fn is_regional_indicator(ch: char) -> bool {
    matches!(ch, '\u{1F1E6}'..='\u{1F1FF}')
}

fn window(cells: &[Cell]) -> String {
    cells.iter().map(|c| c.ch).collect()
}

/// Index of the first cell after the cluster that starts at `col`.
///
/// Returns `cells.len()` at or past the end.
#[must_use]
pub fn next_boundary(cells: &[Cell], col: usize) -> usize {
    if col >= cells.len() {
        return cells.len();
    }
    let end = (col + MAX_CLUSTER_CELLS).min(cells.len());
    let text = window(&cells[col..end]);
    let step = text
        .graphemes(true)
        .next()
        .map_or(1, |g| g.chars().count());
    col + step.max(1)
}

/// Index of the first cell of the cluster that ends at `col`.
///
/// Returns 0 at or before the start. Columns past the end are clamped.
#[must_use]
pub fn prev_boundary(cells: &[Cell], col: usize) -> usize {
    let col = col.min(cells.len());
    if col == 0 {
        return 0;
    }
    let mut start = col.saturating_sub(MAX_CLUSTER_CELLS);
    while start > 0
        && is_regional_indicator(cells[start].ch)
        && is_regional_indicator(cells[start - 1].ch)
    {
        start -= 1;
    }
    let text = window(&cells[start..col]);
    let step = text
        .graphemes(true)
        .next_back()
        .map_or(1, |g| g.chars().count());
    col - step.clamp(1, col)
}

/// Whether a cursor at `col` sits between two clusters.
#[must_use]
pub fn is_boundary(cells: &[Cell], col: usize) -> bool {
    if col == 0 || col >= cells.len() {
        return true;
    }
    next_boundary(cells, prev_boundary(cells, col)) == col
}

/// Snap `col` back to the start of the cluster containing it.
#[must_use]
pub fn floor_boundary(cells: &[Cell], col: usize) -> usize {
    let col = col.min(cells.len());
    if is_boundary(cells, col) {
        col
    } else {
        prev_boundary(cells, col)
    }
}

/// Iterator over the cell ranges of each cluster in `cells`.
#[must_use]
pub const fn clusters(cells: &[Cell]) -> Clusters<'_> {
    Clusters { cells, col: 0 }
}

/// See [`clusters`].
#[derive(Debug, Clone)]
pub struct Clusters<'a> {
    cells: &'a [Cell],
    col: usize,
}

impl Iterator for Clusters<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.col >= self.cells.len() {
            return None;
        }
        let start = self.col;
        self.col = next_boundary(self.cells, start);
        Some(start..self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cells(s: &str) -> Vec<Cell> {
        s.chars().map(Cell::new).collect()
    }

    const FLAG_JP: &str = "\u{1F1EF}\u{1F1F5}";
    const FAMILY: &str = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}\u{200D}\u{1F466}";

    // ── Stepping ─────────────────────────────────────────────────────────

    #[test]
    fn ascii_steps_one_cell() {
        let c = cells("abc");
        assert_eq!(next_boundary(&c, 0), 1);
        assert_eq!(next_boundary(&c, 2), 3);
        assert_eq!(prev_boundary(&c, 3), 2);
        assert_eq!(prev_boundary(&c, 1), 0);
    }

    #[test]
    fn ends_are_clamped() {
        let c = cells("ab");
        assert_eq!(next_boundary(&c, 2), 2);
        assert_eq!(next_boundary(&c, 9), 2);
        assert_eq!(prev_boundary(&c, 0), 0);
        assert_eq!(prev_boundary(&c, 9), 1);
        assert_eq!(next_boundary(&[], 0), 0);
    }

    #[test]
    fn flag_is_one_step() {
        let c = cells(&format!("a{FLAG_JP}b"));
        assert_eq!(c.len(), 4);
        assert_eq!(next_boundary(&c, 1), 3);
        assert_eq!(prev_boundary(&c, 3), 1);
    }

    #[test]
    fn adjacent_flags_pair_up() {
        let c = cells(&format!("{FLAG_JP}{FLAG_JP}{FLAG_JP}"));
        assert_eq!(next_boundary(&c, 0), 2);
        assert_eq!(next_boundary(&c, 2), 4);
        assert_eq!(prev_boundary(&c, 6), 4);
        assert_eq!(prev_boundary(&c, 4), 2);
        assert_eq!(prev_boundary(&c, 2), 0);
    }

    #[test]
    fn long_flag_run_keeps_parity_past_window() {
        // 20 flags = 40 regional indicators, longer than one window.
        let text = FLAG_JP.repeat(20);
        let c = cells(&text);
        assert_eq!(prev_boundary(&c, 40), 38);
        assert_eq!(prev_boundary(&c, 38), 36);
    }

    #[test]
    fn zwj_family_is_one_step() {
        let c = cells(&format!("x{FAMILY}y"));
        assert_eq!(c.len(), 9);
        assert_eq!(next_boundary(&c, 1), 8);
        assert_eq!(prev_boundary(&c, 8), 1);
    }

    #[test]
    fn skin_tone_modifier_attaches() {
        let c = cells("\u{1F44B}\u{1F3FD}!");
        assert_eq!(next_boundary(&c, 0), 2);
        assert_eq!(prev_boundary(&c, 2), 0);
    }

    #[test]
    fn combining_mark_attaches() {
        let c = cells("e\u{301}\u{323}x");
        assert_eq!(next_boundary(&c, 0), 3);
        assert_eq!(prev_boundary(&c, 3), 0);
    }

    #[test]
    fn variation_selector_attaches() {
        let c = cells("\u{2764}\u{FE0F}a");
        assert_eq!(next_boundary(&c, 0), 2);
        assert_eq!(prev_boundary(&c, 2), 0);
    }

    // ── Properties ───────────────────────────────────────────────────────

    #[test]
    fn next_of_prev_is_identity_on_boundaries() {
        let text = format!("a{FLAG_JP}e\u{301}{FAMILY}中\u{1F44B}\u{1F3FD}z");
        let c = cells(&text);
        let bounds: Vec<usize> = clusters(&c).map(|r| r.end).collect();
        for i in bounds {
            assert_eq!(next_boundary(&c, prev_boundary(&c, i)), i, "boundary {i}");
        }
    }

    #[test]
    fn boundary_detection() {
        let c = cells(&format!("a{FLAG_JP}"));
        assert!(is_boundary(&c, 0));
        assert!(is_boundary(&c, 1));
        assert!(!is_boundary(&c, 2));
        assert!(is_boundary(&c, 3));
        assert_eq!(floor_boundary(&c, 2), 1);
        assert_eq!(floor_boundary(&c, 3), 3);
    }

    #[test]
    fn clusters_cover_line() {
        let c = cells(&format!("ab{FAMILY}"));
        let ranges: Vec<Range<usize>> = clusters(&c).collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..9]);
    }
}
