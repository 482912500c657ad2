//! Neighbor layer: per-cell word classification and word motion.
//!
//! Every cell carries a [`Neighbor`] byte: its [`CharClass`] and its
//! [`TokenPosition`] inside the surrounding word. Letters, digits, and
//! underscore join into words; every other class stands alone. The byte is
//! a pure function of the line's codepoints and is recomputed for the whole
//! line whenever the line's cells change. An insert can change the token
//! position of both neighbors, so per-cell patching is not enough.
//!
//! # Motions
//!
//! Word motion groups cells into tokens: runs of word cells, runs of blanks,
//! and runs of other non-blank cells (`hello.world` is three tokens,
//! `a += b` is five). The line-level functions here return `None` when the
//! motion runs off the line; the buffer continues on the adjacent line.

use std::ops::Range;

use cellar_text::{Cell, CharClass, Neighbor, TokenPosition};

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Recompute the neighbor byte of every cell in `cells`.
pub fn compute_line(cells: &mut [Cell]) {
    for cell in cells.iter_mut() {
        cell.neighbor = Neighbor::new(CharClass::of(cell.ch), TokenPosition::Solo);
    }
    for i in 0..cells.len() {
        let class = cells[i].class();
        let word = class.is_word();
        let joins_left = word && i > 0 && cells[i - 1].class().is_word();
        let joins_right = word && i + 1 < cells.len() && cells[i + 1].class().is_word();
        cells[i].neighbor = Neighbor::new(class, TokenPosition::from_joins(joins_left, joins_right));
    }
}

// ---------------------------------------------------------------------------
// Token groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Word,
    Blank,
    Other,
}

const fn group(cell: &Cell) -> Group {
    match cell.class() {
        CharClass::Whitespace => Group::Blank,
        c if c.is_word() => Group::Word,
        _ => Group::Other,
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Start of the next token after the one at `col`, skipping blanks.
///
/// `None` when no token starts after `col` on this line.
#[must_use]
pub fn next_word_start(cells: &[Cell], col: usize) -> Option<usize> {
    let len = cells.len();
    if col >= len {
        return None;
    }
    let mut i = col;
    let start = group(&cells[i]);
    if start != Group::Blank {
        while i < len && group(&cells[i]) == start {
            i += 1;
        }
    }
    while i < len && group(&cells[i]) == Group::Blank {
        i += 1;
    }
    (i < len).then_some(i)
}

/// Start of the token before `col`, skipping blanks.
///
/// `None` when only blanks precede `col` on this line.
#[must_use]
pub fn prev_word_start(cells: &[Cell], col: usize) -> Option<usize> {
    let mut i = col.min(cells.len());
    while i > 0 && group(&cells[i - 1]) == Group::Blank {
        i -= 1;
    }
    if i == 0 {
        return None;
    }
    let g = group(&cells[i - 1]);
    while i > 0 && group(&cells[i - 1]) == g {
        i -= 1;
    }
    Some(i)
}

/// Cell range of the token under `col`.
#[must_use]
pub fn word_at(cells: &[Cell], col: usize) -> Option<Range<usize>> {
    let g = group(cells.get(col)?);
    let mut start = col;
    while start > 0 && group(&cells[start - 1]) == g {
        start -= 1;
    }
    let mut end = col + 1;
    while end < cells.len() && group(&cells[end]) == g {
        end += 1;
    }
    Some(start..end)
}

/// Whether `col` is a blank with only blanks after it.
#[must_use]
pub fn is_trailing_whitespace(cells: &[Cell], col: usize) -> bool {
    cells.get(col..).is_some_and(|rest| {
        !rest.is_empty() && rest.iter().all(|c| c.class() == CharClass::Whitespace)
    })
}

/// Column where trailing whitespace begins, or `cells.len()` if none.
#[must_use]
pub fn trailing_whitespace_start(cells: &[Cell]) -> usize {
    cells
        .iter()
        .rposition(|c| c.class() != CharClass::Whitespace)
        .map_or(0, |i| i + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(s: &str) -> Vec<Cell> {
        let mut cells: Vec<Cell> = s.chars().map(Cell::new).collect();
        compute_line(&mut cells);
        cells
    }

    fn positions(s: &str) -> Vec<TokenPosition> {
        line(s).iter().map(|c| c.neighbor.position()).collect()
    }

    // -- compute_line -------------------------------------------------------

    #[test]
    fn word_positions() {
        use TokenPosition::{End, Middle, Solo, Start};
        assert_eq!(
            positions("ab c_1 x"),
            vec![Start, End, Solo, Start, Middle, End, Solo, Solo]
        );
    }

    #[test]
    fn punctuation_never_joins() {
        use TokenPosition::Solo;
        assert_eq!(positions("+=()"), vec![Solo, Solo, Solo, Solo]);
    }

    #[test]
    fn classes_are_stored() {
        let cells = line("a1_ (\"");
        let classes: Vec<CharClass> = cells.iter().map(|c| c.class()).collect();
        assert_eq!(
            classes,
            vec![
                CharClass::Letter,
                CharClass::Digit,
                CharClass::Underscore,
                CharClass::Whitespace,
                CharClass::Bracket,
                CharClass::Quote,
            ]
        );
    }

    #[test]
    fn insertion_changes_both_neighbors() {
        let mut cells = line("a b");
        cells[1] = Cell::new('x');
        compute_line(&mut cells);
        assert_eq!(cells[0].neighbor.position(), TokenPosition::Start);
        assert_eq!(cells[1].neighbor.position(), TokenPosition::Middle);
        assert_eq!(cells[2].neighbor.position(), TokenPosition::End);
    }

    #[test]
    fn unicode_letters_form_words() {
        use TokenPosition::{End, Start};
        assert_eq!(positions("héé"), vec![Start, TokenPosition::Middle, End]);
    }

    // -- motions ------------------------------------------------------------

    #[test]
    fn next_word_start_steps_tokens() {
        let c = line("foo.bar  baz");
        assert_eq!(next_word_start(&c, 0), Some(3));
        assert_eq!(next_word_start(&c, 3), Some(4));
        assert_eq!(next_word_start(&c, 4), Some(9));
        assert_eq!(next_word_start(&c, 9), None);
        assert_eq!(next_word_start(&c, 50), None);
    }

    #[test]
    fn next_word_start_from_blank() {
        let c = line("a   b");
        assert_eq!(next_word_start(&c, 1), Some(4));
    }

    #[test]
    fn prev_word_start_steps_tokens() {
        let c = line("foo.bar  baz");
        assert_eq!(prev_word_start(&c, 12), Some(9));
        assert_eq!(prev_word_start(&c, 9), Some(4));
        assert_eq!(prev_word_start(&c, 4), Some(3));
        assert_eq!(prev_word_start(&c, 3), Some(0));
        assert_eq!(prev_word_start(&c, 0), None);
    }

    #[test]
    fn prev_word_start_over_leading_blanks() {
        let c = line("   x");
        assert_eq!(prev_word_start(&c, 3), None);
        assert_eq!(prev_word_start(&c, 4), Some(3));
    }

    #[test]
    fn word_at_selects_token() {
        let c = line("let foo_1 = 2;");
        assert_eq!(word_at(&c, 5), Some(4..9));
        assert_eq!(word_at(&c, 3), Some(3..4));
        assert_eq!(word_at(&c, 13), Some(13..14));
        assert_eq!(word_at(&c, 14), None);
    }

    #[test]
    fn trailing_whitespace() {
        let c = line("x = 1 \t ");
        assert!(!is_trailing_whitespace(&c, 1));
        assert!(is_trailing_whitespace(&c, 5));
        assert!(is_trailing_whitespace(&c, 7));
        assert!(!is_trailing_whitespace(&c, 8));
        assert_eq!(trailing_whitespace_start(&c), 5);
        assert_eq!(trailing_whitespace_start(&line("ok")), 2);
        assert_eq!(trailing_whitespace_start(&line("  ")), 0);
    }
}
