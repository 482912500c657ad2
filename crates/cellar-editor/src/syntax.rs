//! Syntax engine: per-line highlighting with block-comment state.
//!
//! [`highlight_line`] scans one line left to right and writes a [`Syntax`]
//! class into every cell. Per cell, the first rule that applies wins:
//!
//! 1. Line-comment marker outside strings and block comments: the rest of
//!    the line is [`Syntax::Comment`].
//! 2. Inside a block comment: [`Syntax::BlockComment`], watching for the
//!    close marker.
//! 3. Outside strings: the block-comment open marker.
//! 4. Strings (if enabled), with `\` skipping the next cell.
//! 5. Numbers (if enabled): digits after a separator, and a `.` or digit
//!    continuing a number.
//! 6. After a separator: the longest keyword from the language table.
//! 7. Everything else is [`Syntax::Normal`].
//!
//! Strings open at the language's quote characters. In Rust, `'a` with no
//! closing quote is a lifetime and stays [`Syntax::Normal`].
//!
//! The only state carried across lines is "inside an unterminated block
//! comment" (for markdown, "inside a fenced code block"). The buffer stores
//! each line's outgoing value and re-runs the following lines until one of
//! them produces the value it already had.

use cellar_text::{Cell, Syntax};

use crate::language::{Grammar, Language, is_separator, matches_at};
use crate::markdown;

/// Highlight `cells` given the incoming multi-line state.
///
/// Returns the outgoing state.
pub fn highlight_line(cells: &mut [Cell], lang: &Language, incoming: bool) -> bool {
    match lang.grammar {
        Grammar::Code => highlight_code(cells, lang, incoming),
        Grammar::Markdown => markdown::highlight_line(cells, incoming),
    }
}

fn highlight_code(cells: &mut [Cell], lang: &Language, in_comment: bool) -> bool {
    for cell in cells.iter_mut() {
        cell.syntax = Syntax::Normal;
    }

    let strings = lang.highlights_strings();
    let numbers = lang.highlights_numbers();
    let mut in_comment = in_comment;
    let mut quote: Option<char> = None;
    let mut prev_sep = true;
    let mut i = 0;

    while i < cells.len() {
        let ch = cells[i].ch;
        let prev = if i > 0 { cells[i - 1].syntax } else { Syntax::Normal };

        // 1. Line comment.
        if quote.is_none() && !in_comment {
            if let Some(marker) = lang.line_comment {
                if matches_at(cells, i, marker).is_some() {
                    mark(&mut cells[i..], Syntax::Comment);
                    break;
                }
            }
        }

        // 2. Inside a block comment.
        if in_comment {
            if let Some(n) = lang.block_comment.and_then(|(_, close)| matches_at(cells, i, close)) {
                mark(&mut cells[i..i + n], Syntax::BlockComment);
                i += n;
                in_comment = false;
                prev_sep = true;
            } else {
                cells[i].syntax = Syntax::BlockComment;
                i += 1;
            }
            continue;
        }

        // 3. Block comment opens.
        if quote.is_none() {
            if let Some(n) = lang.block_comment.and_then(|(open, _)| matches_at(cells, i, open)) {
                mark(&mut cells[i..i + n], Syntax::BlockComment);
                i += n;
                in_comment = true;
                continue;
            }
        }

        // 4. Strings.
        if let Some(q) = quote {
            cells[i].syntax = Syntax::String;
            if ch == '\\' && i + 1 < cells.len() {
                cells[i + 1].syntax = Syntax::String;
                i += 2;
                continue;
            }
            if ch == q {
                quote = None;
            }
            i += 1;
            prev_sep = true;
            continue;
        }
        if let Some(n) = lang.lifetime_at(cells, i) {
            i += n;
            prev_sep = false;
            continue;
        }
        if strings {
            if let Some(q) = lang.quote_at(cells, i) {
                quote = Some(q);
                cells[i].syntax = Syntax::String;
                i += 1;
                continue;
            }
        }

        // 5. Numbers.
        if numbers
            && ((ch.is_ascii_digit() && (prev_sep || prev == Syntax::Number))
                || (ch == '.' && prev == Syntax::Number))
        {
            cells[i].syntax = Syntax::Number;
            i += 1;
            prev_sep = false;
            continue;
        }

        // 6. Keywords.
        if prev_sep {
            if let Some((n, class)) = lang.match_keyword(cells, i) {
                mark(&mut cells[i..i + n], class);
                i += n;
                prev_sep = false;
                continue;
            }
        }

        // 7. Normal.
        prev_sep = is_separator(ch);
        i += 1;
    }

    in_comment
}

fn mark(cells: &mut [Cell], syntax: Syntax) {
    for cell in cells {
        cell.syntax = syntax;
    }
}
