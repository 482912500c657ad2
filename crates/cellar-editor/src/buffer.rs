//! Text buffer: lines over a read-only file mapping.
//!
//! A `Buffer` owns its [`Line`]s, the [`Mapping`] that unedited lines still
//! decode from, the language table, the pair-ID counter, and the undo
//! [`History`]. Every edit goes through here so the derived metadata stays
//! in step with the text:
//!
//! 1. The change is applied to the affected lines (neighbors are recomputed
//!    by [`Line`] itself).
//! 2. The change is recorded in the history.
//! 3. Highlighting re-runs from the first touched row and keeps going while
//!    block-comment state changes.
//! 4. If a touched line holds a delimiter character (bracket, quote,
//!    escape, or a comment-marker character) before or after the change,
//!    the pair pass re-runs. Neighbors of a marker matter as much as the
//!    marker itself: `/x*` is not a comment opener, `/*` is.
//!
//! # Loading
//!
//! [`Buffer::open`] maps the file, indexes newline positions into COLD
//! lines, and analyzes the whole buffer. [`Buffer::open_lazy`] stops after
//! indexing: lines are decoded and highlighted as they are read, and the
//! full analysis happens on the first edit or pair query.
//!
//! # Line endings
//!
//! A trailing `\r` is stripped from every line on load, and a final newline
//! does not create an extra line. Saving writes every line LF-terminated.

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::ops;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use cellar_text::{Cell, PairKind, grapheme, utf8, width};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::history::{Clock, History, Operation, SystemClock};
use crate::language::Language;
use crate::line::{Line, Temperature};
use crate::mapping::Mapping;
use crate::neighbor;
use crate::options::{OptionError, Options};
use crate::pairs::{self, PairIds};
use crate::position::{Position, Range};
use crate::search::{self, Match, SearchDirection};
use crate::syntax;

/// Bytes of the mapping, or nothing once it is released.
fn bytes(mapping: Option<&Mapping>) -> &[u8] {
    mapping.map_or(&[][..], Mapping::as_bytes)
}

/// Split `bytes` at `\n` into COLD lines, dropping a trailing `\r`.
fn index_lines(bytes: &[u8]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let end = bytes[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |i| start + i);
        let mut len = end - start;
        if len > 0 && bytes[start + len - 1] == b'\r' {
            len -= 1;
        }
        lines.push(Line::cold(start, len));
        start = end + 1;
    }
    if lines.is_empty() {
        lines.push(Line::cold(0, 0));
    }
    lines
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// An editable text buffer.
///
/// Always holds at least one line. Positions passed in are clamped to the
/// nearest valid position; no edit panics on an out-of-range position.
pub struct Buffer {
    lines: Vec<Line>,
    mapping: Option<Mapping>,
    path: Option<PathBuf>,
    mtime: Option<SystemTime>,
    language: Language,
    options: Options,
    pair_ids: PairIds,
    history: History,
    clock: Box<dyn Clock>,
    /// Highlighting and pairs have been computed for every line.
    analyzed: bool,
    /// Rows changed since the last refresh, inclusive.
    touched: Option<(usize, usize)>,
    pairs_stale: bool,
    dirty: ops::Range<usize>,
}

impl Buffer {
    // -- Construction -------------------------------------------------------

    /// An empty plain-text buffer with no file path.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lines(vec![Line::empty()], None)
    }

    /// A buffer holding `text`. Lines split at `\n`; a trailing `\r` on each
    /// line is dropped and a final newline adds no line.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let body = text.strip_suffix('\n').unwrap_or(text);
        let lines = body
            .split('\n')
            .map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                Line::from_cells(line.chars().map(Cell::new).collect())
            })
            .collect();
        let mut buf = Self::with_lines(lines, None);
        buf.analyze();
        buf
    }

    fn with_lines(lines: Vec<Line>, mapping: Option<Mapping>) -> Self {
        let options = Options::default();
        Self {
            lines,
            mapping,
            path: None,
            mtime: None,
            language: Language::PLAIN,
            options,
            pair_ids: PairIds::new(),
            history: History::with_window(options.undo_window),
            clock: Box::new(SystemClock),
            analyzed: true,
            touched: None,
            pairs_stale: false,
            dirty: 0..0,
        }
    }

    /// Use `lang` for highlighting and pairing.
    #[must_use]
    pub fn with_language(mut self, lang: &Language) -> Self {
        self.set_language(lang);
        self
    }

    /// Load `path` and analyze every line.
    ///
    /// # Errors
    ///
    /// [`Error::Open`] if the file cannot be opened or mapped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut buf = Self::open_lazy(path)?;
        buf.analyze();
        Ok(buf)
    }

    /// Load `path` without decoding anything. Lines stay COLD until read.
    ///
    /// # Errors
    ///
    /// [`Error::Open`] if the file cannot be opened or mapped.
    pub fn open_lazy(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mapping = Mapping::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let lines = index_lines(mapping.as_bytes());
        debug!(
            path = %path.display(),
            lines = lines.len(),
            bytes = mapping.len(),
            "opened buffer"
        );

        let mut buf = Self::with_lines(lines, Some(mapping));
        buf.path = Some(path.to_path_buf());
        buf.mtime = modified_time(path);
        buf.language = Language::for_path(path).copied().unwrap_or_default();
        buf.analyzed = false;
        Ok(buf)
    }

    /// Re-read the file, discarding edits and history. Pair IDs restart.
    ///
    /// Language, options and clock are kept.
    ///
    /// # Errors
    ///
    /// [`Error::NoPath`] for a buffer never saved, [`Error::Open`] if the
    /// file cannot be read. The buffer is unchanged on error.
    pub fn reload(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(Error::NoPath)?;
        let mut fresh = Self::open_lazy(&path)?;
        fresh.language = self.language;
        fresh.options = self.options;
        fresh.history = History::with_window(self.options.undo_window);
        fresh.clock = std::mem::replace(&mut self.clock, Box::new(SystemClock));
        let analyze = self.analyzed;
        *self = fresh;
        if analyze {
            self.analyze();
        }
        debug!(path = %path.display(), lines = self.lines.len(), "reloaded buffer");
        Ok(())
    }

    // -- Analysis -----------------------------------------------------------

    /// Highlight every line and run the pair pass. Warms every line.
    pub fn analyze(&mut self) {
        self.analyzed = true;
        self.highlight_all();
        self.recompute_pairs();
    }

    fn ensure_analyzed(&mut self) {
        if !self.analyzed {
            self.analyze();
        }
    }

    /// Re-highlight every line, clearing search marks.
    pub fn highlight_all(&mut self) {
        let last = self.lines.len().saturating_sub(1);
        self.rehighlight(0, last);
    }

    /// Language with the option overrides applied.
    fn effective_language(&self) -> Language {
        Language {
            flags: self.options.highlight_flags(self.language.flags),
            ..self.language
        }
    }

    /// Highlight from `first`, always through `forced`, then onward while
    /// a line's outgoing comment state differs from what it had.
    fn rehighlight(&mut self, first: usize, forced: usize) {
        let lang = self.effective_language();
        let source = bytes(self.mapping.as_ref());
        let lines = &mut self.lines;
        let first = first.min(lines.len().saturating_sub(1));

        let mut incoming = first.checked_sub(1).is_some_and(|r| lines[r].open_comment());
        let mut row = first;
        while row < lines.len() {
            let line = &mut lines[row];
            line.warm(source);
            let previous = line.open_comment();
            let outgoing = line
                .tags_mut()
                .map_or(incoming, |cells| syntax::highlight_line(cells, &lang, incoming));
            line.set_open_comment(outgoing);
            row += 1;
            if row > forced && outgoing == previous {
                break;
            }
            incoming = outgoing;
        }

        trace!(first, rows = row - first, "rehighlighted");
        self.dirty = first..row;
    }

    fn recompute_pairs(&mut self) {
        let lang = self.effective_language();
        let source = bytes(self.mapping.as_ref());
        pairs::compute(&mut self.lines, source, &lang, &mut self.pair_ids);
        self.pairs_stale = false;
    }

    /// Bring derived metadata up to date with the edits since the last call.
    fn refresh(&mut self) {
        if let Some((first, last)) = self.touched.take() {
            self.rehighlight(first, last);
        }
        if self.pairs_stale {
            self.recompute_pairs();
        }
    }

    /// Rows re-highlighted by the most recent change.
    #[must_use]
    pub fn dirty_rows(&self) -> ops::Range<usize> {
        self.dirty.clone()
    }

    // -- Text access --------------------------------------------------------

    /// Number of lines. Never zero.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn line(&self, row: usize) -> Option<&Line> {
        self.lines.get(row)
    }

    #[must_use]
    pub fn temperature(&self, row: usize) -> Option<Temperature> {
        self.lines.get(row).map(Line::temperature)
    }

    /// Cells of `row`, decoding it first if needed.
    ///
    /// A COLD row is decoded together with the COLD rows directly above it,
    /// top down from the nearest decoded row (or the first row), so its
    /// highlighting starts from a known comment state.
    pub fn cells(&mut self, row: usize) -> Option<&[Cell]> {
        let line = self.lines.get(row)?;
        if line.is_cold() {
            let first = self.lines[..row]
                .iter()
                .rposition(|l| !l.is_cold())
                .map_or(0, |r| r + 1);
            self.warm_rows(first, row);
        }
        self.lines[row].cells()
    }

    /// Decode and highlight rows `first..=last` in order, each taking the
    /// comment state of the row above.
    fn warm_rows(&mut self, first: usize, last: usize) {
        let lang = self.effective_language();
        let source = bytes(self.mapping.as_ref());
        let lines = &mut self.lines;
        let mut incoming = first.checked_sub(1).is_some_and(|r| lines[r].open_comment());
        for line in &mut lines[first..=last] {
            if line.warm(source) {
                let outgoing = line
                    .tags_mut()
                    .map_or(incoming, |cells| syntax::highlight_line(cells, &lang, incoming));
                line.set_open_comment(outgoing);
            }
            incoming = line.open_comment();
        }
        trace!(first, last, "warmed rows");
    }

    /// Mutable tags of `row`. Only `syntax` and `context` may be written.
    pub(crate) fn tags_mut(&mut self, row: usize) -> Option<&mut [Cell]> {
        self.cells(row)?;
        self.lines.get_mut(row)?.tags_mut()
    }

    /// Decode every line still COLD.
    pub fn warm_all(&mut self) {
        let source = bytes(self.mapping.as_ref());
        for line in &mut self.lines {
            line.warm(source);
        }
    }

    /// Cell count of `row`, zero past the end.
    #[must_use]
    pub fn line_len(&self, row: usize) -> usize {
        let source = bytes(self.mapping.as_ref());
        self.lines.get(row).map_or(0, |line| line.len(source))
    }

    /// The nearest valid position to `pos`.
    #[must_use]
    pub fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.lines.len().saturating_sub(1));
        Position::new(line, pos.col.min(self.line_len(line)))
    }

    // -- Metadata -----------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The language table, without option overrides.
    #[inline]
    #[must_use]
    pub const fn language(&self) -> &Language {
        &self.language
    }

    pub fn set_language(&mut self, lang: &Language) {
        self.language = *lang;
        if self.analyzed {
            self.analyze();
        }
    }

    #[inline]
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Replace the options. Highlighting re-runs if a highlight switch
    /// changed.
    pub fn set_options(&mut self, options: Options) {
        let base = self.language.flags;
        let rerun = options.highlight_flags(base) != self.options.highlight_flags(base);
        self.options = options;
        self.history.set_window(options.undo_window);
        if rerun && self.analyzed {
            self.analyze();
        }
    }

    /// Apply a `:set` argument string. Returns the text of any shows.
    ///
    /// # Errors
    ///
    /// The first word that does not parse; no option changes in that case.
    pub fn apply_set(&mut self, args: &str) -> std::result::Result<Vec<String>, OptionError> {
        let mut options = self.options;
        let shown = options.apply_str(args)?;
        self.set_options(options);
        Ok(shown)
    }

    /// Replace the time source used for undo grouping.
    pub fn set_clock(&mut self, clock: impl Clock + 'static) {
        self.clock = Box::new(clock);
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// True if the text differs from the last save (or load).
    #[inline]
    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.history.is_at_save_point()
    }

    /// Whether the file's modification time moved since it was loaded or
    /// saved by this buffer.
    #[must_use]
    pub fn changed_on_disk(&self) -> bool {
        match (&self.path, self.mtime) {
            (Some(path), Some(seen)) => modified_time(path).is_some_and(|now| now != seen),
            _ => false,
        }
    }

    // -- Editing ------------------------------------------------------------

    fn record(&mut self, op: Operation, before: Position, after: Position) {
        let now = self.clock.now();
        self.history.record(op, before, after, now);
    }

    /// Insert `ch` at `pos`. Returns the cursor after it.
    ///
    /// `\n` splits the line; `\r` is ignored.
    pub fn insert_char(&mut self, pos: Position, ch: char) -> Position {
        match ch {
            '\n' => return self.insert_newline(pos),
            '\r' => return self.clamp(pos),
            _ => {}
        }
        self.ensure_analyzed();
        let at = self.clamp(pos);
        self.raw_insert_cell(at, ch);
        let after = at.with_col(at.col + 1);
        self.record(Operation::InsertChar { at, ch }, at, after);
        self.refresh();
        after
    }

    /// Split the line at `pos`. Returns the start of the new line.
    pub fn insert_newline(&mut self, pos: Position) -> Position {
        self.ensure_analyzed();
        let at = self.clamp(pos);
        self.raw_split(at);
        let after = Position::new(at.line + 1, 0);
        self.record(Operation::InsertNewline { at }, at, after);
        self.refresh();
        after
    }

    /// Insert `text` at `pos` as individual keystrokes. `\r` is dropped.
    /// Returns the cursor after the text.
    pub fn insert_text(&mut self, pos: Position, text: &str) -> Position {
        self.ensure_analyzed();
        let start = self.clamp(pos);
        let mut at = start;
        for ch in text.chars() {
            match ch {
                '\r' => {}
                '\n' => {
                    self.raw_split(at);
                    let after = Position::new(at.line + 1, 0);
                    self.record(Operation::InsertNewline { at }, at, after);
                    at = after;
                }
                _ => {
                    self.raw_insert_cell(at, ch);
                    let after = at.with_col(at.col + 1);
                    self.record(Operation::InsertChar { at, ch }, at, after);
                    at = after;
                }
            }
        }
        self.refresh();
        at
    }

    /// Delete the grapheme cluster at `pos`, or join the next line when
    /// `pos` is at the end of its line. Returns the cursor.
    pub fn delete_forward(&mut self, pos: Position) -> Position {
        self.ensure_analyzed();
        let at = self.clamp(pos);
        let len = self.line_len(at.line);
        if at.col < len {
            let end = self
                .cells(at.line)
                .map_or(at.col + 1, |cells| grapheme::next_boundary(cells, at.col));
            self.delete_cells(at, end - at.col, at);
        } else if at.line + 1 < self.lines.len() {
            self.raw_join(at.line);
            self.record(Operation::DeleteNewline { at }, at, at);
        }
        self.refresh();
        at
    }

    /// Delete the grapheme cluster before `pos`, or join with the previous
    /// line at column 0. Returns the cursor.
    pub fn delete_backward(&mut self, pos: Position) -> Position {
        self.ensure_analyzed();
        let at = self.clamp(pos);
        let cursor = if at.col > 0 {
            let start = self
                .cells(at.line)
                .map_or(at.col - 1, |cells| grapheme::prev_boundary(cells, at.col));
            let start = at.with_col(start);
            self.delete_cells(start, at.col - start.col, at);
            start
        } else if at.line > 0 {
            let joint = Position::new(at.line - 1, self.line_len(at.line - 1));
            self.raw_join(at.line - 1);
            self.record(Operation::DeleteNewline { at: joint }, at, joint);
            joint
        } else {
            at
        };
        self.refresh();
        cursor
    }

    /// Remove `count` cells at `at`, one recorded operation per codepoint.
    fn delete_cells(&mut self, at: Position, count: usize, before: Position) {
        for _ in 0..count {
            if let Some(ch) = self.raw_delete_cell(at) {
                self.record(Operation::DeleteChar { at, ch }, before, at);
            }
        }
    }

    /// Delete the text in `range` as one undo step. Returns its start.
    pub fn delete_range(&mut self, range: Range) -> Position {
        self.ensure_analyzed();
        let range = Range::ordered(self.clamp(range.start), self.clamp(range.end));
        if range.is_empty() {
            return range.start;
        }
        let text = self.raw_delete_range(range);
        self.record(Operation::DeleteRange { range, text }, range.start, range.start);
        self.refresh();
        range.start
    }

    /// Exchange lines `a` and `b` as one undo step. Returns false when the
    /// rows are equal or either is out of range.
    pub fn swap_lines(&mut self, a: usize, b: usize) -> bool {
        self.swap_recorded(a, b, Position::new(a, 0), Position::new(b, 0))
    }

    /// Move the line under `pos` up one row. The cursor travels with it.
    pub fn move_line_up(&mut self, pos: Position) -> Position {
        let at = self.clamp(pos);
        if at.line == 0 {
            return at;
        }
        let after = Position::new(at.line - 1, at.col);
        self.swap_recorded(at.line - 1, at.line, at, after);
        after
    }

    /// Move the line under `pos` down one row. The cursor travels with it.
    pub fn move_line_down(&mut self, pos: Position) -> Position {
        let at = self.clamp(pos);
        let after = Position::new(at.line + 1, at.col);
        if self.swap_recorded(at.line, at.line + 1, at, after) {
            after
        } else {
            at
        }
    }

    fn swap_recorded(&mut self, a: usize, b: usize, before: Position, after: Position) -> bool {
        if a == b || a.max(b) >= self.lines.len() {
            return false;
        }
        self.ensure_analyzed();
        self.raw_swap(a, b);
        self.record(Operation::SwapLines { a, b }, before, after);
        self.refresh();
        true
    }

    // -- Raw edits (no history, no refresh) ---------------------------------

    fn is_delimiter(&self, ch: char) -> bool {
        PairKind::of_bracket(ch).is_some()
            || PairKind::of_quote(ch).is_some()
            || ch == '\\'
            || self.language.line_comment.is_some_and(|m| m.contains(ch))
            || self
                .language
                .block_comment
                .is_some_and(|(open, close)| open.contains(ch) || close.contains(ch))
    }

    fn row_has_delimiters(&self, row: usize) -> bool {
        self.lines
            .get(row)
            .and_then(Line::cells)
            .is_some_and(|cells| cells.iter().any(|c| self.is_delimiter(c.ch)))
    }

    fn touch(&mut self, first: usize, last: usize) {
        self.touched = Some(match self.touched {
            Some((a, b)) => (a.min(first), b.max(last)),
            None => (first, last),
        });
    }

    /// Keep touched rows pointing at the same lines after `added` lines were
    /// inserted and `removed` lines deleted just below `row`.
    fn shift_touched(&mut self, row: usize, added: usize, removed: usize) {
        let shift = |r: usize| {
            if r > row {
                (r + added).saturating_sub(removed).max(row)
            } else {
                r
            }
        };
        if let Some((a, b)) = self.touched {
            self.touched = Some((shift(a), shift(b)));
        }
    }

    pub(crate) fn raw_insert_cell(&mut self, at: Position, ch: char) {
        let at = self.clamp(at);
        let source = bytes(self.mapping.as_ref());
        self.lines[at.line].insert_cell(source, at.col, Cell::new(ch));
        if self.row_has_delimiters(at.line) {
            self.pairs_stale = true;
        }
        self.touch(at.line, at.line);
    }

    pub(crate) fn raw_delete_cell(&mut self, at: Position) -> Option<char> {
        let at = self.clamp(at);
        if at.col >= self.line_len(at.line) {
            return None;
        }
        if self.row_has_delimiters(at.line) {
            self.pairs_stale = true;
        }
        let source = bytes(self.mapping.as_ref());
        let ch = self.lines[at.line].delete_cell(source, at.col)?.ch;
        self.touch(at.line, at.line);
        Some(ch)
    }

    pub(crate) fn raw_split(&mut self, at: Position) {
        let at = self.clamp(at);
        if self.row_has_delimiters(at.line) {
            self.pairs_stale = true;
        }
        let source = bytes(self.mapping.as_ref());
        let tail = self.lines[at.line].split_off(source, at.col);
        self.lines.insert(at.line + 1, tail);
        self.shift_touched(at.line, 1, 0);
        self.touch(at.line, at.line + 1);
    }

    pub(crate) fn raw_join(&mut self, row: usize) {
        if row + 1 >= self.lines.len() {
            return;
        }
        if self.row_has_delimiters(row) || self.row_has_delimiters(row + 1) {
            self.pairs_stale = true;
        }
        let next = self.lines.remove(row + 1);
        let source = bytes(self.mapping.as_ref());
        self.lines[row].join(source, next);
        self.shift_touched(row, 0, 1);
        self.touch(row, row);
    }

    /// Insert `text` verbatim, splitting at `\n`. Returns the end position.
    pub(crate) fn raw_insert_text(&mut self, at: Position, text: &str) -> Position {
        let mut at = self.clamp(at);
        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                self.raw_split(at);
                at = Position::new(at.line + 1, 0);
            }
            let cells: Vec<Cell> = segment.chars().map(Cell::new).collect();
            if cells.is_empty() {
                continue;
            }
            let source = bytes(self.mapping.as_ref());
            self.lines[at.line].insert_cells(source, at.col, &cells);
            if self.row_has_delimiters(at.line) {
                self.pairs_stale = true;
            }
            self.touch(at.line, at.line);
            at.col += cells.len();
        }
        at
    }

    /// Remove `range` and return its text, lines joined with `\n`.
    pub(crate) fn raw_delete_range(&mut self, range: Range) -> String {
        let range = Range::ordered(self.clamp(range.start), self.clamp(range.end));
        let (start, end) = (range.start, range.end);
        let source = bytes(self.mapping.as_ref());
        let lines = &mut self.lines;

        let head_end = if range.is_single_line() { end.col } else { usize::MAX };
        let head = lines[start.line].remove_cells(source, start.col, head_end);
        let mut text = utf8::to_string(&head);

        if !range.is_single_line() {
            let mut removed: Vec<Line> = lines.drain(start.line + 1..=end.line).collect();
            let count = removed.len();
            for (i, line) in removed.iter_mut().enumerate() {
                text.push('\n');
                let cells = if i + 1 == count {
                    line.remove_cells(source, 0, end.col)
                } else {
                    line.warm(source);
                    line.cells().unwrap_or_default().to_vec()
                };
                text.push_str(&utf8::to_string(&cells));
            }
            if let Some(last) = removed.pop() {
                lines[start.line].join(source, last);
            }
        }

        self.pairs_stale = true;
        self.shift_touched(start.line, 0, end.line - start.line);
        self.touch(start.line, start.line);
        text
    }

    pub(crate) fn raw_swap(&mut self, a: usize, b: usize) {
        if a == b || a.max(b) >= self.lines.len() {
            return;
        }
        if self.row_has_delimiters(a) || self.row_has_delimiters(b) {
            self.pairs_stale = true;
        }
        self.lines.swap(a, b);
        self.touch(a.min(b), a.max(b));
    }

    // -- Undo / redo --------------------------------------------------------

    /// Undo the most recent group. Returns the cursor from before it, or
    /// `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Position> {
        let Some(group) = self.history.pop_undo() else {
            debug!("nothing to undo");
            return None;
        };
        group.undo(self);
        let cursor = group.cursor_before();
        self.history.push_redo(group);
        self.pairs_stale = true;
        self.refresh();
        Some(self.clamp(cursor))
    }

    /// Redo the most recently undone group. Returns the cursor from after
    /// it, or `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<Position> {
        let Some(group) = self.history.pop_redo() else {
            debug!("nothing to redo");
            return None;
        };
        group.redo(self);
        let cursor = group.cursor_after();
        self.history.push_undo(group);
        self.pairs_stale = true;
        self.refresh();
        Some(self.clamp(cursor))
    }

    // -- Navigation ---------------------------------------------------------

    /// Start of the next grapheme cluster, wrapping to the next line.
    pub fn next_grapheme(&mut self, pos: Position) -> Position {
        let at = self.clamp(pos);
        let len = self.line_len(at.line);
        if at.col < len {
            let col = self
                .cells(at.line)
                .map_or(len, |cells| grapheme::next_boundary(cells, at.col));
            at.with_col(col)
        } else if at.line + 1 < self.lines.len() {
            Position::new(at.line + 1, 0)
        } else {
            at
        }
    }

    /// Start of the previous grapheme cluster, wrapping to the end of the
    /// previous line.
    pub fn prev_grapheme(&mut self, pos: Position) -> Position {
        let at = self.clamp(pos);
        if at.col > 0 {
            let col = self
                .cells(at.line)
                .map_or(at.col - 1, |cells| grapheme::prev_boundary(cells, at.col));
            at.with_col(col)
        } else if at.line > 0 {
            Position::new(at.line - 1, self.line_len(at.line - 1))
        } else {
            at
        }
    }

    /// Start of the next word. Empty lines count as words. Stops at the end
    /// of the buffer.
    pub fn word_forward(&mut self, pos: Position) -> Position {
        let at = self.clamp(pos);
        if let Some(col) = self
            .cells(at.line)
            .and_then(|cells| neighbor::next_word_start(cells, at.col))
        {
            return at.with_col(col);
        }
        for row in at.line + 1..self.lines.len() {
            let Some(cells) = self.cells(row) else {
                continue;
            };
            if cells.first().is_none_or(|c| !c.is_whitespace()) {
                return Position::new(row, 0);
            }
            if let Some(col) = neighbor::next_word_start(cells, 0) {
                return Position::new(row, col);
            }
        }
        let last = self.lines.len() - 1;
        Position::new(last, self.line_len(last))
    }

    /// Start of the previous word. Empty lines count as words.
    pub fn word_backward(&mut self, pos: Position) -> Position {
        let at = self.clamp(pos);
        if let Some(col) = self
            .cells(at.line)
            .and_then(|cells| neighbor::prev_word_start(cells, at.col))
        {
            return at.with_col(col);
        }
        for row in (0..at.line).rev() {
            let Some(cells) = self.cells(row) else {
                continue;
            };
            if cells.is_empty() {
                return Position::new(row, 0);
            }
            if let Some(col) = neighbor::prev_word_start(cells, cells.len()) {
                return Position::new(row, col);
            }
        }
        Position::ZERO
    }

    /// Span of the token under `pos`.
    pub fn word_at(&mut self, pos: Position) -> Option<Range> {
        let at = self.clamp(pos);
        let span = neighbor::word_at(self.cells(at.line)?, at.col)?;
        Some(Range::new(at.with_col(span.start), at.with_col(span.end)))
    }

    /// Display column of `pos`, with tabs expanded.
    pub fn display_column(&mut self, pos: Position) -> usize {
        let at = self.clamp(pos);
        let tabstop = self.options.tabstop;
        self.cells(at.line)
            .map_or(0, |cells| width::display_column(cells, at.col, tabstop))
    }

    /// Position on `row` whose cluster covers display column `display`.
    pub fn position_at_display(&mut self, row: usize, display: usize) -> Position {
        let at = self.clamp(Position::new(row, 0));
        let tabstop = self.options.tabstop;
        let col = self
            .cells(at.line)
            .map_or(0, |cells| width::column_at_display(cells, display, tabstop));
        at.with_col(col)
    }

    /// The delimiter entangled with the one at `pos`.
    pub fn pair_partner(&mut self, pos: Position) -> Option<Position> {
        self.ensure_analyzed();
        pairs::find_partner(&self.lines, pos)
    }

    /// Bracket-jump target: partner of the first paired cell at or after
    /// `pos` on its line.
    pub fn matching_delimiter(&mut self, pos: Position) -> Option<Position> {
        self.ensure_analyzed();
        pairs::jump_target(&self.lines, self.clamp(pos))
    }

    /// Search for `pattern` from `from` using the buffer's case and wrap
    /// options. The cell at `from` is included.
    ///
    /// # Errors
    ///
    /// [`Error::Pattern`] if `pattern` is not a valid regex.
    pub fn search(
        &mut self,
        pattern: &str,
        from: Position,
        direction: SearchDirection,
    ) -> Result<Option<Match>> {
        let regex = search::compile(pattern, &self.options)?;
        let wrap = self.options.wrapscan;
        Ok(search::find(self, &regex, from, direction, wrap))
    }

    /// Replace every non-empty match of `pattern` with `replacement`, which
    /// may name capture groups as `$1` or `${name}`. Matches never span
    /// lines, but the replacement may contain newlines. All replacements
    /// undo as one step.
    ///
    /// Returns the number of replacements made.
    ///
    /// # Errors
    ///
    /// [`Error::Pattern`] if `pattern` is not a valid regex.
    pub fn replace_all(&mut self, pattern: &str, replacement: &str) -> Result<usize> {
        let regex = search::compile(pattern, &self.options)?;
        self.ensure_analyzed();

        let mut count = 0;
        let mut row = 0;
        while row < self.lines.len() {
            let found = self
                .cells(row)
                .map(|cells| search::line_replacements(&regex, cells, replacement))
                .unwrap_or_default();
            let Some(&(first, ..)) = found.first() else {
                row += 1;
                continue;
            };
            if count == 0 {
                self.history.begin_batch(Position::new(row, first));
            }

            // Right to left, so earlier columns stay valid.
            let mut added = 0;
            for (col, len, text) in found.into_iter().rev() {
                let start = Position::new(row, col);
                let range = Range::new(start, start.with_col(col + len));
                let removed = self.raw_delete_range(range);
                self.record(Operation::DeleteRange { range, text: removed }, start, start);
                if !text.is_empty() {
                    added += text.matches('\n').count();
                    let end = self.raw_insert_text(start, &text);
                    let range = Range::new(start, end);
                    self.record(Operation::InsertText { range, text }, start, end);
                }
                count += 1;
            }
            row += added + 1;
        }

        if count > 0 {
            self.history.end_batch();
            self.refresh();
        }
        debug!(pattern, count, "replaced");
        Ok(count)
    }

    // -- File I/O -----------------------------------------------------------

    /// The whole text, every line LF-terminated. A buffer that is a single
    /// empty line flattens to nothing.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let source = bytes(self.mapping.as_ref());
        if self.lines.len() == 1 && self.lines[0].is_empty(source) {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(source.len());
        for line in &self.lines {
            line.write_bytes(source, &mut out);
            out.push(b'\n');
        }
        out
    }

    /// Save to the buffer's path.
    ///
    /// # Errors
    ///
    /// [`Error::NoPath`] if the buffer has no path, [`Error::Save`] if
    /// writing fails.
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(Error::NoPath)?;
        self.save_as(&path)
    }

    /// Save to `path` and make it the buffer's path.
    ///
    /// Every line is decoded and the mapping released before the file is
    /// truncated. On failure the text, history and modified flag are left
    /// alone.
    ///
    /// # Errors
    ///
    /// [`Error::Save`] if the file cannot be created or written.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.warm_all();
        let out = self.to_bytes();
        self.mapping = None;

        let written = File::create(path).and_then(|mut file| file.write_all(&out));
        if let Err(source) = written {
            warn!(path = %path.display(), error = %source, "save failed");
            return Err(Error::Save {
                path: path.to_path_buf(),
                source,
            });
        }

        self.path = Some(path.to_path_buf());
        self.mtime = modified_time(path);
        self.history.mark_saved();
        debug!(
            path = %path.display(),
            lines = self.lines.len(),
            bytes = out.len(),
            "saved buffer"
        );
        Ok(())
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("path", &self.path)
            .field("lines", &self.lines.len())
            .field("language", &self.language.name)
            .field("mapped", &self.mapping.is_some())
            .field("modified", &self.is_modified())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
