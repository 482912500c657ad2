//! Markdown highlighting.
//!
//! Each line is classified block first: fence, indented code, heading,
//! blockquote, thematic break, list item, table row. Inline spans (escapes,
//! code, images, links, emphasis) are then marked in whatever the block
//! left as [`Syntax::Normal`].
//!
//! The state carried between lines is "inside a fenced code block". A line
//! opening with three or more backticks or tildes starts one; inside, a
//! fence line with nothing but blanks after the run ends it.

use cellar_text::{Cell, Syntax};

/// Leading spaces allowed before a block marker.
const MAX_INDENT: usize = 3;

/// Highlight one markdown line given whether it starts inside a fence.
///
/// Returns whether the next line starts inside a fence.
pub fn highlight_line(cells: &mut [Cell], in_fence: bool) -> bool {
    mark(cells, Syntax::Normal);

    if in_fence {
        mark(cells, Syntax::CodeBlock);
        return !closes_fence(cells);
    }

    let spaces = cells.iter().take_while(|c| c.ch == ' ').count();
    if spaces > MAX_INDENT || cells.get(spaces).is_some_and(|c| c.ch == '\t') {
        mark(cells, Syntax::CodeBlock);
        return false;
    }
    if fence_end(cells).is_some() {
        mark(cells, Syntax::CodeBlock);
        return true;
    }
    if spaces < cells.len() {
        block(cells, spaces);
    }
    false
}

fn mark(cells: &mut [Cell], syntax: Syntax) {
    for cell in cells {
        cell.syntax = syntax;
    }
}

/// Length of the run of `ch` starting at `at`.
fn run(cells: &[Cell], at: usize, ch: char) -> usize {
    cells.iter().skip(at).take_while(|c| c.ch == ch).count()
}

fn is_at(cells: &[Cell], at: usize, ch: char) -> bool {
    cells.get(at).is_some_and(|c| c.ch == ch)
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// End of a fence run (three or more backticks or tildes after at most three
/// spaces), if the line starts with one.
fn fence_end(cells: &[Cell]) -> Option<usize> {
    let at = cells.iter().take(MAX_INDENT).take_while(|c| c.ch == ' ').count();
    let ch = cells.get(at)?.ch;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = run(cells, at, ch);
    (len >= 3).then_some(at + len)
}

fn closes_fence(cells: &[Cell]) -> bool {
    fence_end(cells).is_some_and(|end| cells[end..].iter().all(|c| c.ch == ' ' || c.ch == '\t'))
}

fn block(cells: &mut [Cell], at: usize) {
    let ch = cells[at].ch;

    if ch == '#' {
        let level = run(cells, at, '#');
        if level <= 6 && cells.get(at + level).is_none_or(|c| c.ch == ' ') {
            mark(cells, Syntax::Heading);
            return;
        }
    }

    if ch == '>' {
        let end = if is_at(cells, at + 1, ' ') { at + 2 } else { at + 1 };
        mark(&mut cells[at..end], Syntax::BlockQuote);
        inline(cells, end);
        return;
    }

    if matches!(ch, '-' | '*' | '_') && is_rule(&cells[at..], ch) {
        mark(cells, Syntax::Rule);
        return;
    }

    if let Some(end) = list_marker(cells, at) {
        mark(&mut cells[at..end], Syntax::ListMarker);
        let body = match task_marker(cells, end) {
            Some(task_end) => {
                mark(&mut cells[end..task_end], Syntax::TaskMarker);
                task_end
            }
            None => end,
        };
        inline(cells, body);
        return;
    }

    if ch == '|' {
        if is_table_separator(&cells[at..]) {
            mark(cells, Syntax::Table);
            return;
        }
        for cell in cells.iter_mut().filter(|c| c.ch == '|') {
            cell.syntax = Syntax::Table;
        }
    }

    inline(cells, at);
}

/// Three or more of `ch` with nothing but spaces between them.
fn is_rule(cells: &[Cell], ch: char) -> bool {
    cells.iter().all(|c| c.ch == ch || c.ch == ' ') && cells.iter().filter(|c| c.ch == ch).count() >= 3
}

/// End of a `- `, `* `, `+ `, `1. ` or `1) ` marker at `at`.
fn list_marker(cells: &[Cell], at: usize) -> Option<usize> {
    let ch = cells.get(at)?.ch;
    if matches!(ch, '-' | '*' | '+') {
        return is_at(cells, at + 1, ' ').then_some(at + 2);
    }
    let digits = cells.iter().skip(at).take_while(|c| c.ch.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let delim = at + digits;
    (matches!(cells.get(delim).map(|c| c.ch), Some('.' | ')')) && is_at(cells, delim + 1, ' '))
        .then_some(delim + 2)
}

/// End of a `[ ]`, `[x]` or `[X]` task box at `at`, with its trailing space.
fn task_marker(cells: &[Cell], at: usize) -> Option<usize> {
    if !is_at(cells, at, '[') || !is_at(cells, at + 2, ']') {
        return None;
    }
    if !matches!(cells[at + 1].ch, ' ' | 'x' | 'X') {
        return None;
    }
    Some(if is_at(cells, at + 3, ' ') { at + 4 } else { at + 3 })
}

/// `|---|:--:|` style row: only pipes, dashes, colons and spaces, with at
/// least one dash.
fn is_table_separator(cells: &[Cell]) -> bool {
    is_at(cells, 0, '|')
        && cells.iter().all(|c| matches!(c.ch, '|' | '-' | ':' | ' '))
        && cells.iter().any(|c| c.ch == '-')
}

// ---------------------------------------------------------------------------
// Inline spans
// ---------------------------------------------------------------------------

const fn is_escapable(ch: char) -> bool {
    matches!(
        ch,
        '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '#' | '+' | '-' | '.' | '!' | '|'
    )
}

fn inline(cells: &mut [Cell], start: usize) {
    let mut pos = start;
    while pos < cells.len() {
        if cells[pos].syntax != Syntax::Normal {
            pos += 1;
            continue;
        }
        let ch = cells[pos].ch;
        let next = cells.get(pos + 1).map(|c| c.ch);

        if ch == '\\' && next.is_some_and(is_escapable) {
            mark(&mut cells[pos..pos + 2], Syntax::Escape);
            pos += 2;
            continue;
        }

        let end = match ch {
            '`' => code_span(cells, pos),
            '!' if next == Some('[') => link(cells, pos + 1, true),
            '[' => link(cells, pos, false),
            '*' | '_' => emphasis(cells, pos),
            _ => None,
        };
        pos = end.unwrap_or(pos + 1);
    }
}

/// Mark a code span opened by a backtick run at `at`. The closing run must
/// be the same length.
fn code_span(cells: &mut [Cell], at: usize) -> Option<usize> {
    let open = run(cells, at, '`');
    let mut pos = at + open;
    while pos < cells.len() {
        if cells[pos].ch == '`' {
            let close = run(cells, pos, '`');
            pos += close;
            if close == open {
                mark(&mut cells[at..pos], Syntax::CodeSpan);
                return Some(pos);
            }
        } else {
            pos += 1;
        }
    }
    None
}

/// Mark `[text](url)` starting at the `[` at `at`. With `image`, the `!`
/// before it is marked too.
fn link(cells: &mut [Cell], at: usize, image: bool) -> Option<usize> {
    let text_end = balanced(cells, at, '[', ']')?;
    if !is_at(cells, text_end, '(') {
        return None;
    }
    let url_end = balanced(cells, text_end, '(', ')')?;

    if image {
        cells[at - 1].syntax = Syntax::Image;
    }
    mark(&mut cells[at..text_end], Syntax::LinkText);
    mark(&mut cells[text_end..url_end], Syntax::LinkUrl);
    Some(url_end)
}

/// One past the `close` that balances the `open` at `at`.
fn balanced(cells: &[Cell], at: usize, open: char, close: char) -> Option<usize> {
    if !is_at(cells, at, open) {
        return None;
    }
    let mut depth = 0usize;
    for (i, cell) in cells.iter().enumerate().skip(at) {
        if cell.ch == open {
            depth += 1;
        } else if cell.ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
    }
    None
}

/// Mark `*em*`, `**strong**` or `***both***` (or the `_` forms) opened at
/// `at`. The opening run must be followed by a non-space and the closing
/// run preceded by one.
fn emphasis(cells: &mut [Cell], at: usize) -> Option<usize> {
    let delim = cells[at].ch;
    let open = run(cells, at, delim);
    let mut pos = at + open;
    if cells.get(pos).is_none_or(|c| c.ch == ' ') {
        return None;
    }

    while pos < cells.len() {
        if cells[pos].ch != delim {
            pos += 1;
            continue;
        }
        let close_start = pos;
        let close = run(cells, pos, delim);
        pos += close;
        if cells[close_start - 1].ch == ' ' || close < open {
            continue;
        }
        let (syntax, width) = match open.min(close) {
            1 => (Syntax::Emphasis, 1),
            2 => (Syntax::Strong, 2),
            _ => (Syntax::StrongEmphasis, 3),
        };
        let end = close_start + width;
        mark(&mut cells[at..end], syntax);
        return Some(end);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// One letter per cell: n=normal h=heading e=emphasis s=strong
    /// S=strong+emphasis c=code span C=code block t=link text u=link url
    /// i=image q=quote l=list marker x=task r=rule \=escape |=table.
    fn md(s: &str, in_fence: bool) -> (String, bool) {
        let mut cells: Vec<Cell> = s.chars().map(Cell::new).collect();
        let out = highlight_line(&mut cells, in_fence);
        let tags = cells
            .iter()
            .map(|c| match c.syntax {
                Syntax::Normal => 'n',
                Syntax::Heading => 'h',
                Syntax::Emphasis => 'e',
                Syntax::Strong => 's',
                Syntax::StrongEmphasis => 'S',
                Syntax::CodeSpan => 'c',
                Syntax::CodeBlock => 'C',
                Syntax::LinkText => 't',
                Syntax::LinkUrl => 'u',
                Syntax::Image => 'i',
                Syntax::BlockQuote => 'q',
                Syntax::ListMarker => 'l',
                Syntax::TaskMarker => 'x',
                Syntax::Rule => 'r',
                Syntax::Escape => '\\',
                Syntax::Table => '|',
                _ => '?',
            })
            .collect();
        (tags, out)
    }

    fn tags(s: &str) -> String {
        md(s, false).0
    }

    // -- Blocks -------------------------------------------------------------

    #[test]
    fn headings() {
        assert_eq!(tags("# Title"), "hhhhhhh");
        assert_eq!(tags("###"), "hhh");
        assert_eq!(tags("#hashtag"), "nnnnnnnn");
        assert_eq!(tags("####### x"), "nnnnnnnnn");
    }

    #[test]
    fn fences_open_and_close() {
        assert_eq!(md("```rust", false), ("CCCCCCC".to_string(), true));
        assert_eq!(md("let x = 1;", true), ("CCCCCCCCCC".to_string(), true));
        assert_eq!(md("```rust", true), ("CCCCCCC".to_string(), true));
        assert_eq!(md("~~~ ", true), ("CCCC".to_string(), false));
        assert_eq!(md("``", false), ("nn".to_string(), false));
    }

    #[test]
    fn indented_code() {
        assert_eq!(tags("    code"), "CCCCCCCC");
        assert_eq!(tags("\tcode"), "CCCCC");
    }

    #[test]
    fn blockquote_then_inline() {
        assert_eq!(tags("> a *b*"), "qqnneee");
    }

    #[test]
    fn rules() {
        assert_eq!(tags("---"), "rrr");
        assert_eq!(tags("* * *"), "rrrrr");
        assert_eq!(tags("--"), "nn");
    }

    #[test]
    fn list_markers() {
        assert_eq!(tags("- item"), "llnnnn");
        assert_eq!(tags("12. item"), "llllnnnn");
        assert_eq!(tags("1) x"), "llln");
        assert_eq!(tags("-item"), "nnnnn");
    }

    #[test]
    fn task_boxes() {
        assert_eq!(tags("- [x] done"), "llxxxxnnnn");
        assert_eq!(tags("- [ ] todo"), "llxxxxnnnn");
    }

    #[test]
    fn tables() {
        assert_eq!(tags("|---|:-:|"), "|||||||||");
        assert_eq!(tags("| a | `b` |"), "|nnn|ncccn|");
    }

    // -- Inline -------------------------------------------------------------

    #[test]
    fn emphasis_levels() {
        assert_eq!(tags("*a*"), "eee");
        assert_eq!(tags("__a__"), "sssss");
        assert_eq!(tags("***a***"), "SSSSSSS");
        assert_eq!(tags("a * b"), "nnnnn");
        assert_eq!(tags("*a *"), "nnnn");
    }

    #[test]
    fn code_span_needs_matching_run() {
        assert_eq!(tags("x `y` z"), "nncccnn");
        assert_eq!(tags("``a`b``"), "ccccccc");
        assert_eq!(tags("`open"), "nnnnn");
    }

    #[test]
    fn links_and_images() {
        assert_eq!(tags("[a](b)"), "tttuuu");
        assert_eq!(tags("![a](b)"), "itttuuu");
        assert_eq!(tags("[a] (b)"), "nnnnnnn");
        assert_eq!(tags("[[x]](y(z))"), "tttttuuuuuu");
    }

    #[test]
    fn escapes() {
        assert_eq!(tags(r"\*a\*"), r"\\n\\");
        assert_eq!(tags(r"\a"), "nn");
    }

    #[test]
    fn empty_line_passes_state_through() {
        assert_eq!(md("", false), (String::new(), false));
        assert_eq!(md("", true), (String::new(), true));
    }
}
