//! Line storage with lazy decoding.
//!
//! A [`Line`] is in one of three states:
//!
//! | State  | Holds                       | Entered by              |
//! |--------|-----------------------------|-------------------------|
//! | COLD   | byte offset + length only   | file load               |
//! | WARM   | decoded cells               | first read or write     |
//! | HOT    | cells, mapping bytes stale  | any content mutation    |
//!
//! Transitions only go forward. The cells live inside the WARM and HOT
//! variants, so code holding a COLD line has nothing to read: every accessor
//! either returns `None` for COLD or takes the mapping bytes and warms the
//! line first.
//!
//! Syntax and pair tags are metadata, not content. Writing them goes through
//! [`Line::tags_mut`] and leaves the state alone; only edits that change
//! codepoints promote to HOT.

use cellar_text::{Cell, utf8};

use crate::neighbor;

/// Lazy-loading lifecycle state of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temperature {
    Cold,
    Warm,
    Hot,
}

#[derive(Clone, PartialEq, Eq)]
enum Content {
    Cold { offset: usize, len: usize },
    Warm(Vec<Cell>),
    Hot(Vec<Cell>),
}

/// One buffer line plus the block-comment state flowing out of it.
#[derive(Clone, PartialEq, Eq)]
pub struct Line {
    content: Content,
    open_comment: bool,
}

impl Line {
    /// A line whose bytes sit at `offset..offset + len` in the mapping.
    #[must_use]
    pub const fn cold(offset: usize, len: usize) -> Self {
        Self {
            content: Content::Cold { offset, len },
            open_comment: false,
        }
    }

    /// An edited line with the given cells. Neighbor bytes are computed.
    #[must_use]
    pub fn from_cells(mut cells: Vec<Cell>) -> Self {
        neighbor::compute_line(&mut cells);
        Self {
            content: Content::Hot(cells),
            open_comment: false,
        }
    }

    /// A new, empty edited line.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            content: Content::Hot(Vec::new()),
            open_comment: false,
        }
    }

    #[must_use]
    pub const fn temperature(&self) -> Temperature {
        match self.content {
            Content::Cold { .. } => Temperature::Cold,
            Content::Warm(_) => Temperature::Warm,
            Content::Hot(_) => Temperature::Hot,
        }
    }

    #[must_use]
    pub const fn is_cold(&self) -> bool {
        matches!(self.content, Content::Cold { .. })
    }

    // -----------------------------------------------------------------------
    // Materialization
    // -----------------------------------------------------------------------

    /// Decode the line from `source` (the whole mapping) if it is COLD.
    ///
    /// Idempotent. Malformed bytes become U+FFFD cells. Returns `true` if
    /// this call did the decoding.
    pub fn warm(&mut self, source: &[u8]) -> bool {
        let Content::Cold { offset, len } = self.content else {
            return false;
        };
        let start = offset.min(source.len());
        let end = offset.saturating_add(len).min(source.len());
        let mut cells = utf8::decode(&source[start..end]);
        neighbor::compute_line(&mut cells);
        self.content = Content::Warm(cells);
        true
    }

    /// The cells, or `None` while COLD.
    #[must_use]
    pub fn cells(&self) -> Option<&[Cell]> {
        match &self.content {
            Content::Cold { .. } => None,
            Content::Warm(cells) | Content::Hot(cells) => Some(cells),
        }
    }

    /// Mutable access to the cells' tags, or `None` while COLD.
    ///
    /// The slice cannot grow or shrink and the line keeps its state. Callers
    /// must only touch `syntax` and `context`.
    pub fn tags_mut(&mut self) -> Option<&mut [Cell]> {
        match &mut self.content {
            Content::Cold { .. } => None,
            Content::Warm(cells) | Content::Hot(cells) => Some(cells),
        }
    }

    /// Number of cells. For a COLD line this counts codepoints in place.
    #[must_use]
    pub fn len(&self, source: &[u8]) -> usize {
        match &self.content {
            Content::Cold { offset, len } => {
                let start = (*offset).min(source.len());
                let end = offset.saturating_add(*len).min(source.len());
                utf8::count(&source[start..end])
            }
            Content::Warm(cells) | Content::Hot(cells) => cells.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self, source: &[u8]) -> bool {
        self.len(source) == 0
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Warm, promote to HOT, run `f` on the cells, then recompute neighbors.
    fn edit<R>(&mut self, source: &[u8], f: impl FnOnce(&mut Vec<Cell>) -> R) -> R {
        self.warm(source);
        let mut cells = match std::mem::replace(&mut self.content, Content::Hot(Vec::new())) {
            Content::Warm(cells) | Content::Hot(cells) => cells,
            Content::Cold { .. } => Vec::new(),
        };
        let result = f(&mut cells);
        neighbor::compute_line(&mut cells);
        self.content = Content::Hot(cells);
        result
    }

    /// Insert `cell` at `index`, appending when `index` is past the end.
    pub fn insert_cell(&mut self, source: &[u8], index: usize, cell: Cell) {
        self.edit(source, |cells| {
            let index = index.min(cells.len());
            cells.insert(index, cell);
        });
    }

    /// Remove the cell at `index`, or the last cell when `index` is past
    /// the end. `None` on an empty line.
    pub fn delete_cell(&mut self, source: &[u8], index: usize) -> Option<Cell> {
        self.edit(source, |cells| {
            if cells.is_empty() {
                return None;
            }
            let index = index.min(cells.len() - 1);
            Some(cells.remove(index))
        })
    }

    /// Insert `new` at `index` (clamped).
    pub fn insert_cells(&mut self, source: &[u8], index: usize, new: &[Cell]) {
        self.edit(source, |cells| {
            let index = index.min(cells.len());
            cells.splice(index..index, new.iter().copied());
        });
    }

    /// Remove and return the cells in `start..end` (clamped).
    pub fn remove_cells(&mut self, source: &[u8], start: usize, end: usize) -> Vec<Cell> {
        self.edit(source, |cells| {
            let end = end.min(cells.len());
            let start = start.min(end);
            cells.drain(start..end).collect()
        })
    }

    /// Split at `index` (clamped), returning the tail as a new HOT line.
    ///
    /// The tail inherits this line's outgoing comment state, since the end
    /// of the old line is now the end of the tail.
    pub fn split_off(&mut self, source: &[u8], index: usize) -> Self {
        let tail = self.edit(source, |cells| {
            let index = index.min(cells.len());
            cells.split_off(index)
        });
        let mut line = Self::from_cells(tail);
        line.open_comment = self.open_comment;
        line
    }

    /// Append `other`'s cells to this line. The joined line takes `other`'s
    /// outgoing comment state.
    pub fn join(&mut self, source: &[u8], mut other: Self) {
        other.warm(source);
        let tail = other.cells().map(<[Cell]>::to_vec).unwrap_or_default();
        self.edit(source, |cells| cells.extend(tail));
        self.open_comment = other.open_comment;
    }

    // -----------------------------------------------------------------------
    // Encoding & state
    // -----------------------------------------------------------------------

    /// UTF-8 encoding of the line's content.
    ///
    /// WARM and HOT lines encode their cells. A COLD line is decoded and
    /// re-encoded from `source` without materializing, so the result is the
    /// same as warming first.
    #[must_use]
    pub fn to_bytes(&self, source: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_bytes(source, &mut out);
        out
    }

    /// Append the line's UTF-8 encoding to `out`.
    pub fn write_bytes(&self, source: &[u8], out: &mut Vec<u8>) {
        match &self.content {
            Content::Cold { offset, len } => {
                let start = (*offset).min(source.len());
                let end = offset.saturating_add(*len).min(source.len());
                let mut buf = [0u8; 4];
                for ch in utf8::chars(&source[start..end]) {
                    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
            Content::Warm(cells) | Content::Hot(cells) => utf8::encode_into(cells, out),
        }
    }

    /// Whether a block comment is still open at the end of this line.
    #[must_use]
    pub const fn open_comment(&self) -> bool {
        self.open_comment
    }

    pub const fn set_open_comment(&mut self, open: bool) {
        self.open_comment = open;
    }
}

impl std::fmt::Debug for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Line");
        s.field("temperature", &self.temperature());
        match &self.content {
            Content::Cold { offset, len } => {
                s.field("offset", offset).field("len", len);
            }
            Content::Warm(cells) | Content::Hot(cells) => {
                s.field("text", &utf8::to_string(cells));
            }
        }
        s.field("open_comment", &self.open_comment).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_text::{Syntax, TokenPosition};
    use pretty_assertions::assert_eq;

    fn text(line: &Line) -> String {
        utf8::to_string(line.cells().unwrap())
    }

    const SOURCE: &[u8] = b"first\ns\xC3\xA9cond \xE4\xB8\xAD\nbad\xFFbyte";

    // -- Lifecycle ----------------------------------------------------------

    #[test]
    fn cold_line_has_no_cells() {
        let line = Line::cold(0, 5);
        assert_eq!(line.temperature(), Temperature::Cold);
        assert!(line.cells().is_none());
    }

    #[test]
    fn warm_decodes_once() {
        let mut line = Line::cold(6, "sécond 中".len());
        assert!(line.warm(SOURCE));
        assert_eq!(line.temperature(), Temperature::Warm);
        assert_eq!(text(&line), "sécond 中");
        assert!(!line.warm(SOURCE));
    }

    #[test]
    fn warm_computes_neighbors() {
        let mut line = Line::cold(0, 5);
        line.warm(SOURCE);
        let cells = line.cells().unwrap();
        assert_eq!(cells[0].neighbor.position(), TokenPosition::Start);
        assert_eq!(cells[4].neighbor.position(), TokenPosition::End);
    }

    #[test]
    fn warm_replaces_malformed_bytes() {
        let offset = SOURCE.len() - 8;
        let mut line = Line::cold(offset, 8);
        line.warm(SOURCE);
        assert_eq!(text(&line), "bad\u{FFFD}byte");
    }

    #[test]
    fn warm_past_end_of_source_is_empty() {
        let mut line = Line::cold(1000, 4);
        line.warm(SOURCE);
        assert_eq!(line.cells().unwrap().len(), 0);
    }

    #[test]
    fn cold_len_counts_codepoints() {
        let line = Line::cold(6, "sécond 中".len());
        assert_eq!(line.len(SOURCE), 8);
        assert!(line.is_cold());
    }

    #[test]
    fn tag_writes_keep_line_warm() {
        let mut line = Line::cold(0, 5);
        line.warm(SOURCE);
        line.tags_mut().unwrap()[0].syntax = Syntax::KeywordPrimary;
        assert_eq!(line.temperature(), Temperature::Warm);
    }

    // -- Mutation -----------------------------------------------------------

    #[test]
    fn insert_promotes_to_hot() {
        let mut line = Line::cold(0, 5);
        line.insert_cell(SOURCE, 0, Cell::new('>'));
        assert_eq!(line.temperature(), Temperature::Hot);
        assert_eq!(text(&line), ">first");
    }

    #[test]
    fn insert_past_end_appends() {
        let mut line = Line::cold(0, 5);
        line.insert_cell(SOURCE, 99, Cell::new('!'));
        assert_eq!(text(&line), "first!");
    }

    #[test]
    fn delete_clamps_to_last_cell() {
        let mut line = Line::cold(0, 5);
        assert_eq!(line.delete_cell(SOURCE, 99).map(|c| c.ch), Some('t'));
        assert_eq!(text(&line), "firs");
        assert_eq!(Line::empty().delete_cell(SOURCE, 0), None);
    }

    #[test]
    fn insert_then_delete_restores_cells() {
        let mut line = Line::cold(0, 5);
        line.warm(SOURCE);
        let before = line.cells().unwrap().to_vec();
        line.insert_cell(SOURCE, 2, Cell::new('x'));
        line.delete_cell(SOURCE, 2);
        assert_eq!(line.cells().unwrap(), before.as_slice());
    }

    #[test]
    fn split_and_join() {
        let mut line = Line::from_cells("hello world".chars().map(Cell::new).collect());
        line.set_open_comment(true);
        let tail = line.split_off(&[], 5);
        assert_eq!(text(&line), "hello");
        assert_eq!(text(&tail), " world");
        assert!(tail.open_comment());

        line.set_open_comment(false);
        line.join(&[], tail);
        assert_eq!(text(&line), "hello world");
        assert!(line.open_comment());
    }

    #[test]
    fn join_warms_cold_tail() {
        let mut line = Line::cold(0, 5);
        line.join(SOURCE, Line::cold(0, 5));
        assert_eq!(text(&line), "firstfirst");
    }

    #[test]
    fn remove_and_insert_cells() {
        let mut line = Line::from_cells("abcdef".chars().map(Cell::new).collect());
        let removed = line.remove_cells(&[], 1, 4);
        assert_eq!(utf8::to_string(&removed), "bcd");
        assert_eq!(text(&line), "aef");
        line.insert_cells(&[], 1, &removed);
        assert_eq!(text(&line), "abcdef");
        assert!(line.remove_cells(&[], 9, 12).is_empty());
    }

    // -- Encoding -----------------------------------------------------------

    #[test]
    fn to_bytes_round_trips_warm() {
        let len = "sécond 中".len();
        let mut line = Line::cold(6, len);
        line.warm(SOURCE);
        assert_eq!(line.to_bytes(SOURCE), &SOURCE[6..6 + len]);
    }

    #[test]
    fn cold_to_bytes_matches_warm() {
        let offset = SOURCE.len() - 8;
        let cold = Line::cold(offset, 8);
        let mut warm = cold.clone();
        warm.warm(SOURCE);
        assert_eq!(cold.to_bytes(SOURCE), warm.to_bytes(SOURCE));
        assert_eq!(cold.to_bytes(SOURCE), "bad\u{FFFD}byte".as_bytes());
    }

    #[test]
    fn debug_shows_state() {
        let line = Line::cold(3, 4);
        assert_eq!(
            format!("{line:?}"),
            "Line { temperature: Cold, offset: 3, len: 4, open_comment: false }"
        );
    }
}
