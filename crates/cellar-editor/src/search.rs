//! Search: regex matching over buffer lines.
//!
//! Patterns are compiled with the [`regex`] crate and run one line at a
//! time; a match never spans a newline. Byte offsets from the regex engine
//! are converted to cell columns before they leave this module.
//!
//! # Match marking
//!
//! [`mark_matches`] tags every matched cell with [`Syntax::SearchMatch`].
//! The marks live in the cells' syntax field, so the next re-highlight of a
//! line clears them; [`clear_matches`] re-highlights the whole buffer.

use cellar_text::{Cell, Syntax, utf8};
use regex::{Regex, RegexBuilder};

use crate::buffer::Buffer;
use crate::error::Result;
use crate::options::Options;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Search direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SearchDirection {
    Forward,
    Backward,
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// A search match: start position and length in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub start: Position,
    pub len: usize,
}

/// Compile `pattern` honoring the `ignorecase` option.
///
/// # Errors
///
/// [`crate::Error::Pattern`] if the pattern does not parse.
pub fn compile(pattern: &str, options: &Options) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(options.ignorecase)
        .build()?)
}

/// Matches in one line as `(start column, length)` in cells.
#[must_use]
pub fn line_matches(regex: &Regex, cells: &[Cell]) -> Vec<(usize, usize)> {
    let text = utf8::to_string(cells);
    let mut out = Vec::new();
    let (mut byte, mut col) = (0, 0);
    for m in regex.find_iter(&text) {
        col += text[byte..m.start()].chars().count();
        let len = m.as_str().chars().count();
        out.push((col, len));
        col += len;
        byte = m.end();
    }
    out
}

/// Non-empty matches in one line as `(start column, length, expansion)`,
/// where the expansion is `replacement` with `$1`, `${name}` and `$$`
/// substituted from the match's captures.
#[must_use]
pub fn line_replacements(
    regex: &Regex,
    cells: &[Cell],
    replacement: &str,
) -> Vec<(usize, usize, String)> {
    let text = utf8::to_string(cells);
    let mut out = Vec::new();
    let (mut byte, mut col) = (0, 0);
    for caps in regex.captures_iter(&text) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        if m.as_str().is_empty() {
            continue;
        }
        col += text[byte..m.start()].chars().count();
        let len = m.as_str().chars().count();
        let mut expanded = String::new();
        caps.expand(replacement, &mut expanded);
        out.push((col, len, expanded));
        col += len;
        byte = m.end();
    }
    out
}

fn matches_on(buf: &mut Buffer, regex: &Regex, row: usize) -> Vec<(usize, usize)> {
    buf.cells(row)
        .map(|cells| line_matches(regex, cells))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Search functions
// ---------------------------------------------------------------------------

/// Find the first match at or after `from`.
///
/// The cell at `from` is included; pass `col + 1` to skip the current
/// match. With `wrap`, the search continues from the top of the buffer and
/// ends back on `from`'s line before `from`.
#[must_use]
pub fn find_forward(buf: &mut Buffer, regex: &Regex, from: Position, wrap: bool) -> Option<Match> {
    let from = buf.clamp(from);
    let count = buf.line_count();
    let rows = if wrap { count + 1 } else { count - from.line };

    for offset in 0..rows {
        let row = (from.line + offset) % count;
        let found = matches_on(buf, regex, row).into_iter().find(|&(col, _)| {
            if offset == 0 {
                col >= from.col
            } else if offset == count {
                col < from.col
            } else {
                true
            }
        });
        if let Some((col, len)) = found {
            return Some(Match {
                start: Position::new(row, col),
                len,
            });
        }
    }
    None
}

/// Find the last match at or before `from`.
///
/// The cell at `from` is included. With `wrap`, the search continues from
/// the bottom of the buffer and ends back on `from`'s line after `from`.
#[must_use]
pub fn find_backward(buf: &mut Buffer, regex: &Regex, from: Position, wrap: bool) -> Option<Match> {
    let from = buf.clamp(from);
    let count = buf.line_count();
    let rows = if wrap { count + 1 } else { from.line + 1 };

    for offset in 0..rows {
        let row = (from.line + count * 2 - offset) % count;
        let found = matches_on(buf, regex, row).into_iter().rev().find(|&(col, _)| {
            if offset == 0 {
                col <= from.col
            } else if offset == count {
                col > from.col
            } else {
                true
            }
        });
        if let Some((col, len)) = found {
            return Some(Match {
                start: Position::new(row, col),
                len,
            });
        }
    }
    None
}

/// Find the next match in the given direction.
#[must_use]
pub fn find(
    buf: &mut Buffer,
    regex: &Regex,
    from: Position,
    direction: SearchDirection,
    wrap: bool,
) -> Option<Match> {
    match direction {
        SearchDirection::Forward => find_forward(buf, regex, from, wrap),
        SearchDirection::Backward => find_backward(buf, regex, from, wrap),
    }
}

/// All matches in rows `[start_line, end_line)`, in document order.
#[must_use]
pub fn find_all(buf: &mut Buffer, regex: &Regex, start_line: usize, end_line: usize) -> Vec<Match> {
    let end_line = end_line.min(buf.line_count());
    (start_line..end_line)
        .flat_map(|row| {
            matches_on(buf, regex, row)
                .into_iter()
                .map(move |(col, len)| Match {
                    start: Position::new(row, col),
                    len,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Tag every matched cell as [`Syntax::SearchMatch`]. Returns the number of
/// non-empty matches.
pub fn mark_matches(buf: &mut Buffer, regex: &Regex) -> usize {
    let mut marked = 0;
    for row in 0..buf.line_count() {
        let matches = matches_on(buf, regex, row);
        let Some(cells) = buf.tags_mut(row) else {
            continue;
        };
        for (col, len) in matches.into_iter().filter(|&(_, len)| len > 0) {
            for cell in &mut cells[col..col + len] {
                cell.syntax = Syntax::SearchMatch;
            }
            marked += 1;
        }
    }
    marked
}

/// Remove search marks by re-highlighting every line.
pub fn clear_matches(buf: &mut Buffer) {
    buf.highlight_all();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use pretty_assertions::assert_eq;

    fn re(pattern: &str) -> Regex {
        compile(pattern, &Options::default()).unwrap()
    }

    fn at(buf: &mut Buffer, pattern: &str, line: usize, col: usize) -> Option<(usize, usize)> {
        find_forward(buf, &re(pattern), Position::new(line, col), true)
            .map(|m| (m.start.line, m.start.col))
    }

    fn back(buf: &mut Buffer, pattern: &str, line: usize, col: usize) -> Option<(usize, usize)> {
        find_backward(buf, &re(pattern), Position::new(line, col), true)
            .map(|m| (m.start.line, m.start.col))
    }

    #[test]
    fn columns_are_cells_not_bytes() {
        let cells: Vec<Cell> = "h\u{E9}llo w\u{F6}rld".chars().map(Cell::new).collect();
        assert_eq!(line_matches(&re("w.r"), &cells), vec![(6, 3)]);
        assert_eq!(line_matches(&re("l+"), &cells), vec![(2, 2), (9, 1)]);
    }

    #[test]
    fn replacements_expand_captures() {
        let cells: Vec<Cell> = "k=v, \u{E9}=w".chars().map(Cell::new).collect();
        let found = line_replacements(&re(r"(\w)=(\w)"), &cells, "$2:$1");
        assert_eq!(
            found,
            vec![(0, 3, "v:k".to_string()), (5, 3, "w:\u{E9}".to_string())]
        );
    }

    #[test]
    fn replacements_skip_empty_matches() {
        let cells: Vec<Cell> = "abba".chars().map(Cell::new).collect();
        let found = line_replacements(&re("b*"), &cells, "-");
        assert_eq!(found, vec![(1, 2, "-".to_string())]);
    }

    // -- Forward ------------------------------------------------------------

    #[test]
    fn forward_includes_start() {
        let mut buf = Buffer::from_text("foo bar foo");
        assert_eq!(at(&mut buf, "foo", 0, 0), Some((0, 0)));
        assert_eq!(at(&mut buf, "foo", 0, 1), Some((0, 8)));
    }

    #[test]
    fn forward_multi_line_and_wrap() {
        let mut buf = Buffer::from_text("aaa\nbbb x\nccc");
        assert_eq!(at(&mut buf, "x", 0, 0), Some((1, 4)));
        assert_eq!(at(&mut buf, "a+", 1, 0), Some((0, 0)));
        assert_eq!(at(&mut buf, "b", 1, 1), Some((1, 1)));
    }

    #[test]
    fn forward_wraps_to_same_line() {
        let mut buf = Buffer::from_text("x one\ntwo");
        assert_eq!(at(&mut buf, "x", 0, 1), Some((0, 0)));
    }

    #[test]
    fn forward_without_wrap_stops() {
        let mut buf = Buffer::from_text("hit\nmiss");
        let found = find_forward(&mut buf, &re("hit"), Position::new(1, 0), false);
        assert_eq!(found, None);
    }

    #[test]
    fn no_match() {
        let mut buf = Buffer::from_text("abc");
        assert_eq!(at(&mut buf, "z", 0, 0), None);
        assert_eq!(back(&mut buf, "z", 0, 2), None);
    }

    // -- Backward -----------------------------------------------------------

    #[test]
    fn backward_includes_start() {
        let mut buf = Buffer::from_text("foo bar foo");
        assert_eq!(back(&mut buf, "foo", 0, 8), Some((0, 8)));
        assert_eq!(back(&mut buf, "foo", 0, 7), Some((0, 0)));
    }

    #[test]
    fn backward_wraps_to_bottom() {
        let mut buf = Buffer::from_text("one\ntwo\nthree");
        assert_eq!(back(&mut buf, "th", 0, 0), Some((2, 0)));
        assert_eq!(back(&mut buf, "o", 1, 0), Some((0, 0)));
    }

    #[test]
    fn backward_without_wrap_stops() {
        let mut buf = Buffer::from_text("miss\nhit");
        let found = find_backward(&mut buf, &re("hit"), Position::new(0, 3), false);
        assert_eq!(found, None);
    }

    // -- Options ------------------------------------------------------------

    #[test]
    fn ignorecase_option() {
        let mut buf = Buffer::from_text("Hello");
        let m = buf.search("hello", Position::ZERO, SearchDirection::Forward).unwrap();
        assert_eq!(m, None);
        buf.apply_set("ic").unwrap();
        let m = buf.search("hello", Position::ZERO, SearchDirection::Forward).unwrap();
        assert_eq!(m, Some(Match { start: Position::ZERO, len: 5 }));
    }

    #[test]
    fn wrapscan_option() {
        let mut buf = Buffer::from_text("hit\nmiss");
        let from = Position::new(1, 0);
        assert!(buf.search("hit", from, SearchDirection::Forward).unwrap().is_some());
        buf.apply_set("nows").unwrap();
        assert!(buf.search("hit", from, SearchDirection::Forward).unwrap().is_none());
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let mut buf = Buffer::from_text("x");
        assert!(buf.search("(", Position::ZERO, SearchDirection::Forward).is_err());
    }

    // -- Marking ------------------------------------------------------------

    #[test]
    fn find_all_in_range() {
        let mut buf = Buffer::from_text("ab ab\nab\nab");
        let all = find_all(&mut buf, &re("ab"), 0, 2);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].start, Position::new(1, 0));
        assert_eq!(find_all(&mut buf, &re("ab"), 2, 99).len(), 1);
    }

    #[test]
    fn mark_and_clear() {
        let mut buf = Buffer::from_text("int x = xx;").with_language(&Language::C);
        assert_eq!(mark_matches(&mut buf, &re("x+")), 2);
        let tags: Vec<Syntax> = buf.cells(0).unwrap().iter().map(|c| c.syntax).collect();
        assert_eq!(tags[4], Syntax::SearchMatch);
        assert_eq!(tags[8], Syntax::SearchMatch);
        assert_eq!(tags[9], Syntax::SearchMatch);
        assert_eq!(tags[0], Syntax::KeywordSecondary);

        clear_matches(&mut buf);
        assert_eq!(buf.cells(0).unwrap()[4].syntax, Syntax::Normal);
    }

    #[test]
    fn empty_matches_are_not_marked() {
        let mut buf = Buffer::from_text("abc");
        assert_eq!(mark_matches(&mut buf, &re("z*")), 0);
    }
}
