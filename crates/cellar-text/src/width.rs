// SPDX-License-Identifier: MIT
//
// Display width of cells and clusters.
//
// A single codepoint takes its East Asian Width (0, 1, or 2 columns); a tab
// advances to the next tab stop. Multi-codepoint clusters are two columns
// when any member asks for emoji presentation: U+FE0F, a regional
// indicator, a ZWJ sequence containing a pictograph, or any member that is
// wide on its own. Everything else takes the width of its first visible
// member, or one column when no member has width.

use unicode_width::UnicodeWidthChar;

use crate::cell::Cell;
use crate::grapheme::{self, is_regional_indicator};

const VS16: char = '\u{FE0F}';
const ZWJ: char = '\u{200D}';

/// Width of one codepoint. Controls are zero.
#[inline]
#[must_use]
pub fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// Columns a tab at `column` advances to reach the next stop.
#[inline]
#[must_use]
pub const fn tab_advance(column: usize, tab_width: usize) -> usize {
    let tab_width = if tab_width == 0 { 1 } else { tab_width };
    tab_width - column % tab_width
}

const fn is_pictographic(ch: char) -> bool {
    matches!(
        ch,
        '\u{2300}'..='\u{23FF}' | '\u{2600}'..='\u{27BF}' | '\u{1F000}'..='\u{1FAFF}'
    )
}

/// Width of a cluster drawn at display `column`.
#[must_use]
pub fn cluster_width(cluster: &[Cell], column: usize, tab_width: usize) -> usize {
    match cluster {
        [] => 0,
        [only] if only.ch == '\t' => tab_advance(column, tab_width),
        [only] => char_width(only.ch),
        _ => {
            let joined = cluster.iter().any(|c| c.ch == ZWJ);
            let wide = cluster.iter().any(|c| {
                c.ch == VS16
                    || is_regional_indicator(c.ch)
                    || char_width(c.ch) >= 2
                    || (joined && is_pictographic(c.ch))
            });
            if wide {
                2
            } else {
                cluster
                    .iter()
                    .map(|c| char_width(c.ch))
                    .find(|&w| w > 0)
                    .unwrap_or(1)
            }
        }
    }
}

/// Display column at which cell `col` starts.
///
/// `col` is snapped to its cluster start; past the end it measures the
/// whole line.
#[must_use]
pub fn display_column(cells: &[Cell], col: usize, tab_width: usize) -> usize {
    let target = grapheme::floor_boundary(cells, col);
    let mut display = 0;
    for range in grapheme::clusters(cells) {
        if range.start >= target {
            break;
        }
        display += cluster_width(&cells[range], display, tab_width);
    }
    display
}

/// Cell index of the cluster covering display column `display`.
///
/// A column inside a wide cluster or tab maps to that cluster's start.
/// Columns past the end map to `cells.len()`.
#[must_use]
pub fn column_at_display(cells: &[Cell], display: usize, tab_width: usize) -> usize {
    let mut x = 0;
    for range in grapheme::clusters(cells) {
        let w = cluster_width(&cells[range.clone()], x, tab_width);
        if display < x + w.max(1) {
            return range.start;
        }
        x += w;
    }
    cells.len()
}

/// Total display width of a line.
#[must_use]
pub fn line_width(cells: &[Cell], tab_width: usize) -> usize {
    grapheme::clusters(cells).fold(0, |x, range| x + cluster_width(&cells[range], x, tab_width))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(s: &str) -> Vec<Cell> {
        s.chars().map(Cell::new).collect()
    }

    fn width_of(s: &str) -> usize {
        cluster_width(&cells(s), 0, 4)
    }

    // ── Single codepoints ────────────────────────────────────────────────

    #[test]
    fn narrow_wide_and_zero() {
        assert_eq!(width_of("a"), 1);
        assert_eq!(width_of("中"), 2);
        assert_eq!(width_of("\u{301}"), 0);
        assert_eq!(width_of("\u{7}"), 0);
    }

    #[test]
    fn tab_aligns_to_stop() {
        let tab = cells("\t");
        assert_eq!(cluster_width(&tab, 0, 4), 4);
        assert_eq!(cluster_width(&tab, 1, 4), 3);
        assert_eq!(cluster_width(&tab, 4, 4), 4);
        assert_eq!(cluster_width(&tab, 5, 8), 3);
    }

    #[test]
    fn zero_tab_width_is_treated_as_one() {
        assert_eq!(tab_advance(7, 0), 1);
    }

    // ── Clusters ─────────────────────────────────────────────────────────

    #[test]
    fn flag_is_two_columns() {
        assert_eq!(width_of("\u{1F1EF}\u{1F1F5}"), 2);
    }

    #[test]
    fn emoji_presentation_selector_is_two_columns() {
        assert_eq!(width_of("\u{2764}\u{FE0F}"), 2);
    }

    #[test]
    fn zwj_sequence_is_two_columns() {
        assert_eq!(width_of("\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}"), 2);
        assert_eq!(width_of("\u{2695}\u{200D}\u{2640}"), 2);
    }

    #[test]
    fn combining_sequence_takes_base_width() {
        assert_eq!(width_of("e\u{301}"), 1);
        assert_eq!(width_of("\u{301}\u{301}"), 1);
    }

    // ── Line conversions ─────────────────────────────────────────────────

    #[test]
    fn display_column_counts_clusters() {
        let c = cells("a中\tb");
        assert_eq!(display_column(&c, 0, 4), 0);
        assert_eq!(display_column(&c, 1, 4), 1);
        assert_eq!(display_column(&c, 2, 4), 3);
        assert_eq!(display_column(&c, 3, 4), 4);
        assert_eq!(display_column(&c, 4, 4), 5);
        assert_eq!(line_width(&c, 4), 5);
    }

    #[test]
    fn display_column_snaps_inside_cluster() {
        let c = cells("xe\u{301}y");
        assert_eq!(display_column(&c, 2, 4), 1);
        assert_eq!(display_column(&c, 3, 4), 2);
    }

    #[test]
    fn column_at_display_inverts() {
        let c = cells("a中\tb");
        assert_eq!(column_at_display(&c, 0, 4), 0);
        assert_eq!(column_at_display(&c, 1, 4), 1);
        assert_eq!(column_at_display(&c, 2, 4), 1);
        assert_eq!(column_at_display(&c, 3, 4), 2);
        assert_eq!(column_at_display(&c, 4, 4), 3);
        assert_eq!(column_at_display(&c, 5, 4), 4);
        assert_eq!(column_at_display(&c, 40, 4), 4);
    }
}
