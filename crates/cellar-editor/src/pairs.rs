//! Pair entanglement: buffer-wide delimiter matching.
//!
//! One left-to-right pass over every cell of every line links each opener
//! to its closer by writing the same pair ID into both cells'
//! [`PairContext`]. The pass treats the buffer as a single cell stream: a
//! block comment or an unclosed brace may span any number of lines.
//!
//! # Rules
//!
//! - Block-comment markers pair with each other. Everything between them is
//!   skipped, brackets included.
//! - With string highlighting on, one of the language's quotes opens a
//!   string that ends at the same quote or at end of line. Brackets inside
//!   are skipped, `\` escapes the next cell. A Rust lifetime is not a quote.
//! - A line-comment marker ends scanning for the rest of its line.
//! - An opening bracket pushes a fresh ID. A closing bracket links to the
//!   nearest open bracket of the same kind; unmatched openers above it are
//!   dropped and stay unlinked. A closer with no opener keeps an empty
//!   context.
//!
//! # IDs
//!
//! IDs come from the buffer's [`PairIds`] counter and are never reused
//! between reloads, except that a pass starting with more than half of the
//! 24-bit space used restarts at 1. Every context is rewritten by the pass,
//! so no stale ID survives a restart.

use cellar_text::{Cell, PairContext, PairKind, PairRole};
use tracing::{trace, warn};

use crate::language::{Language, matches_at};
use crate::line::Line;
use crate::position::Position;

// ---------------------------------------------------------------------------
// ID allocation
// ---------------------------------------------------------------------------

/// Monotonic pair ID source, scoped to one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairIds {
    next: u32,
}

impl PairIds {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// The ID the next allocation will return.
    #[must_use]
    pub const fn peek(&self) -> u32 {
        self.next
    }

    fn allocate(&mut self) -> Option<u32> {
        if self.next > PairContext::MAX_ID {
            return None;
        }
        let id = self.next;
        self.next += 1;
        Some(id)
    }

    fn begin_pass(&mut self) {
        if self.next > PairContext::MAX_ID / 2 {
            warn!(next = self.next, "pair id space half used, restarting at 1");
            self.next = 1;
        }
    }
}

impl Default for PairIds {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Pass
// ---------------------------------------------------------------------------

struct Open {
    id: u32,
    kind: PairKind,
}

fn link(cells: &mut [Cell], id: u32, kind: PairKind, role: PairRole) {
    let ctx = PairContext::new(id, kind, role);
    for cell in cells {
        cell.context = ctx;
    }
}

/// Recompute every cell's pair context. Warms all lines.
///
/// Returns the number of linked pairs.
pub fn compute(lines: &mut [Line], source: &[u8], lang: &Language, ids: &mut PairIds) -> usize {
    ids.begin_pass();
    let first_id = ids.peek();

    let strings = lang.highlights_strings();
    let mut stack: Vec<Open> = Vec::new();
    let mut comment: Option<u32> = None;
    let mut linked = 0;

    for line in lines.iter_mut() {
        line.warm(source);
        let Some(cells) = line.tags_mut() else {
            continue;
        };
        for cell in cells.iter_mut() {
            cell.context = PairContext::NONE;
        }

        let mut string: Option<(char, PairKind, u32)> = None;
        let mut col = 0;
        while col < cells.len() {
            let ch = cells[col].ch;

            if let Some(id) = comment {
                if let Some(n) = lang.block_comment.and_then(|(_, close)| matches_at(cells, col, close)) {
                    link(&mut cells[col..col + n], id, PairKind::Comment, PairRole::Closer);
                    comment = None;
                    linked += 1;
                    col += n;
                } else {
                    col += 1;
                }
                continue;
            }

            if let Some((quote, kind, id)) = string {
                if ch == '\\' {
                    col += 2;
                    continue;
                }
                if ch == quote {
                    link(&mut cells[col..=col], id, kind, PairRole::Closer);
                    string = None;
                    linked += 1;
                }
                col += 1;
                continue;
            }

            if lang.line_comment.is_some_and(|m| matches_at(cells, col, m).is_some()) {
                break;
            }

            if let Some(n) = lang.block_comment.and_then(|(open, _)| matches_at(cells, col, open)) {
                if let Some(id) = ids.allocate() {
                    link(&mut cells[col..col + n], id, PairKind::Comment, PairRole::Opener);
                    comment = Some(id);
                }
                col += n;
                continue;
            }

            if let Some(n) = lang.lifetime_at(cells, col) {
                col += n;
                continue;
            }

            if strings {
                if let Some((quote, kind)) = lang
                    .quote_at(cells, col)
                    .and_then(|q| PairKind::of_quote(q).map(|kind| (q, kind)))
                {
                    if let Some(id) = ids.allocate() {
                        link(&mut cells[col..=col], id, kind, PairRole::Opener);
                        string = Some((quote, kind, id));
                    }
                    col += 1;
                    continue;
                }
            }

            match PairKind::of_bracket(ch) {
                Some((kind, PairRole::Opener)) => {
                    if let Some(id) = ids.allocate() {
                        link(&mut cells[col..=col], id, kind, PairRole::Opener);
                        stack.push(Open { id, kind });
                    }
                }
                Some((kind, _)) => {
                    if let Some(at) = stack.iter().rposition(|open| open.kind == kind) {
                        let id = stack[at].id;
                        stack.truncate(at);
                        link(&mut cells[col..=col], id, kind, PairRole::Closer);
                        linked += 1;
                    }
                }
                None => {}
            }
            col += 1;
        }
    }

    trace!(
        lines = lines.len(),
        linked,
        unmatched = stack.len(),
        ids_used = ids.peek() - first_id,
        "pair pass"
    );
    linked
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

fn context_at(lines: &[Line], pos: Position) -> Option<PairContext> {
    Some(lines.get(pos.line)?.cells()?.get(pos.col)?.context)
}

/// Position of the cell entangled with the delimiter at `pos`.
///
/// For multi-cell comment markers the partner's first cell is returned.
/// `None` for cells outside any pair and for unmatched openers.
#[must_use]
pub fn find_partner(lines: &[Line], pos: Position) -> Option<Position> {
    let ctx = context_at(lines, pos)?;
    let id = ctx.id();
    match ctx.role() {
        PairRole::None => None,
        PairRole::Opener => {
            for (row, line) in lines.iter().enumerate().skip(pos.line) {
                let cells = line.cells().unwrap_or_default();
                let start = if row == pos.line { pos.col + 1 } else { 0 };
                if let Some(i) = cells.iter().skip(start).position(|c| {
                    c.context.id() == id && c.context.role() == PairRole::Closer
                }) {
                    return Some(Position::new(row, start + i));
                }
            }
            None
        }
        PairRole::Closer => {
            for row in (0..=pos.line).rev() {
                let cells = lines[row].cells().unwrap_or_default();
                let end = if row == pos.line { pos.col.min(cells.len()) } else { cells.len() };
                let is_opener =
                    |c: &Cell| c.context.id() == id && c.context.role() == PairRole::Opener;
                if let Some(mut i) = cells[..end].iter().rposition(is_opener) {
                    while i > 0 && is_opener(&cells[i - 1]) {
                        i -= 1;
                    }
                    return Some(Position::new(row, i));
                }
            }
            None
        }
    }
}

/// Bracket-jump target from `pos`: the partner of the first paired cell at
/// or after `pos` on its line.
#[must_use]
pub fn jump_target(lines: &[Line], pos: Position) -> Option<Position> {
    let cells = lines.get(pos.line)?.cells()?;
    (pos.col..cells.len())
        .filter(|&col| !cells[col].context.is_none())
        .find_map(|col| find_partner(lines, Position::new(pos.line, col)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
