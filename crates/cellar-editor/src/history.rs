//! Undo/redo history: an operation log with time-based grouping.
//!
//! Every buffer mutation is recorded as a reversible [`Operation`] carrying
//! only its delta: one codepoint, one newline, or the saved text of a range
//! deletion. Never a snapshot. Operations are grouped into [`Group`]s, the
//! unit of undo/redo:
//!
//! - Operations of the same kind recorded less than the coalescing window
//!   apart (default 1 s) join the open group.
//! - A pause of at least the window, or a change between inserting and
//!   deleting, seals the group and opens a new one.
//! - A range deletion, a text replacement, or a line swap is always a
//!   group of its own.
//! - Between [`History::begin_batch`] and [`History::end_batch`] every
//!   operation joins one group, whatever its kind or timing. Replace-all
//!   uses this.
//!
//! # Usage
//!
//! ```text
//! history.record(op, cursor_before, cursor_after, clock.now());
//! // ...
//! let group = history.pop_undo()?;   // seals the open group first
//! group.undo(&mut buffer);
//! history.push_redo(group);
//! ```
//!
//! A new record after an undo drops the redo stack: history never forks.
//! Time comes from a [`Clock`] so tests can step it by hand.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::buffer::Buffer;
use crate::position::{Position, Range};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Monotonic time source for undo grouping.
pub trait Clock: fmt::Debug {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A single reversible buffer edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `ch` was inserted at `at`. Undo removes the cell at `at`.
    InsertChar { at: Position, ch: char },

    /// `ch` was removed from `at`. Undo puts it back.
    DeleteChar { at: Position, ch: char },

    /// The line was split at `at`. Undo joins `at.line` with the next line.
    InsertNewline { at: Position },

    /// Line `at.line` was joined with the next one; `at` is where the
    /// split was. Undo splits there again.
    DeleteNewline { at: Position },

    /// `text` was removed from `range`. Undo inserts it at `range.start`.
    DeleteRange { range: Range, text: String },

    /// `text` was inserted and now occupies `range`. Undo removes `range`.
    InsertText { range: Range, text: String },

    /// Lines `a` and `b` traded places. Its own inverse.
    SwapLines { a: usize, b: usize },
}

/// Grouping class of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Insert,
    Delete,
    Range,
}

impl Operation {
    const fn kind(&self) -> Kind {
        match self {
            Self::InsertChar { .. } | Self::InsertNewline { .. } => Kind::Insert,
            Self::DeleteChar { .. } | Self::DeleteNewline { .. } => Kind::Delete,
            Self::DeleteRange { .. } | Self::InsertText { .. } | Self::SwapLines { .. } => {
                Kind::Range
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// Operations that undo and redo as one step, plus the cursor on either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    operations: Vec<Operation>,
    cursor_before: Position,
    cursor_after: Position,
}

impl Group {
    const fn new(cursor: Position) -> Self {
        Self {
            operations: Vec::new(),
            cursor_before: cursor,
            cursor_after: cursor,
        }
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    #[must_use]
    pub const fn cursor_before(&self) -> Position {
        self.cursor_before
    }

    #[must_use]
    pub const fn cursor_after(&self) -> Position {
        self.cursor_after
    }

    /// Apply each operation's inverse, last first.
    pub(crate) fn undo(&self, buf: &mut Buffer) {
        for op in self.operations.iter().rev() {
            match op {
                Operation::InsertChar { at, .. } => {
                    buf.raw_delete_cell(*at);
                }
                Operation::DeleteChar { at, ch } => buf.raw_insert_cell(*at, *ch),
                Operation::InsertNewline { at } => buf.raw_join(at.line),
                Operation::DeleteNewline { at } => buf.raw_split(*at),
                Operation::DeleteRange { range, text } => {
                    buf.raw_insert_text(range.start, text);
                }
                Operation::InsertText { range, .. } => {
                    buf.raw_delete_range(*range);
                }
                Operation::SwapLines { a, b } => buf.raw_swap(*a, *b),
            }
        }
    }

    /// Re-apply the operations in recorded order.
    pub(crate) fn redo(&self, buf: &mut Buffer) {
        for op in &self.operations {
            match op {
                Operation::InsertChar { at, ch } => buf.raw_insert_cell(*at, *ch),
                Operation::DeleteChar { at, .. } => {
                    buf.raw_delete_cell(*at);
                }
                Operation::InsertNewline { at } => buf.raw_split(*at),
                Operation::DeleteNewline { at } => buf.raw_join(at.line),
                Operation::DeleteRange { range, .. } => {
                    buf.raw_delete_range(*range);
                }
                Operation::InsertText { range, text } => {
                    buf.raw_insert_text(range.start, text);
                }
                Operation::SwapLines { a, b } => buf.raw_swap(*a, *b),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Undo/redo log for one buffer.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Group>,
    redo_stack: Vec<Group>,
    pending: Option<Group>,
    last: Option<(Instant, Kind)>,
    window: Duration,
    save_point: Option<usize>,
    /// Cursor before the open batch, while one is open.
    batch: Option<Position>,
}

impl History {
    /// Default coalescing window.
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

    /// An empty history whose save point is the empty state.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_window(Self::DEFAULT_WINDOW)
    }

    #[must_use]
    pub const fn with_window(window: Duration) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending: None,
            last: None,
            window,
            save_point: Some(0),
            batch: None,
        }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    pub const fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Record an operation performed at `now`.
    ///
    /// `before` is the cursor before the operation; it becomes the group's
    /// restore point only if the operation opens a new group. `after`
    /// always becomes the group's post-cursor.
    pub fn record(&mut self, op: Operation, before: Position, after: Position, now: Instant) {
        if !self.redo_stack.is_empty() {
            if self.save_point.is_some_and(|sp| sp > self.depth()) {
                self.save_point = None;
            }
            self.redo_stack.clear();
        }

        if let Some(cursor) = self.batch {
            let group = self.pending.get_or_insert_with(|| Group::new(cursor));
            group.operations.push(op);
            group.cursor_after = after;
            return;
        }

        let kind = op.kind();
        let fresh = self.last.is_none_or(|(then, last_kind)| {
            now.saturating_duration_since(then) >= self.window || last_kind != kind
        });
        if fresh || kind == Kind::Range {
            self.seal();
        }

        let group = self.pending.get_or_insert_with(|| Group::new(before));
        group.operations.push(op);
        group.cursor_after = after;
        self.last = Some((now, kind));

        if kind == Kind::Range {
            self.seal();
        }
    }

    /// Close the open group so the next record starts a new one.
    pub fn seal(&mut self) {
        if let Some(group) = self.pending.take() {
            if !group.operations.is_empty() {
                self.undo_stack.push(group);
            }
        }
        self.last = None;
    }

    /// Seal the open group and collect everything recorded until
    /// [`History::end_batch`] into one group restoring `cursor`.
    pub fn begin_batch(&mut self, cursor: Position) {
        self.seal();
        self.batch = Some(cursor);
    }

    /// Close the batch group. A batch that recorded nothing leaves no group.
    pub fn end_batch(&mut self) {
        self.batch = None;
        self.seal();
    }

    /// Seal, then take the most recent group for undoing.
    pub(crate) fn pop_undo(&mut self) -> Option<Group> {
        self.seal();
        self.undo_stack.pop()
    }

    pub(crate) fn push_redo(&mut self, group: Group) {
        self.redo_stack.push(group);
    }

    pub(crate) fn pop_redo(&mut self) -> Option<Group> {
        self.seal();
        self.redo_stack.pop()
    }

    pub(crate) fn push_undo(&mut self, group: Group) {
        self.undo_stack.push(group);
    }

    /// Number of undo steps available, the open group included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.undo_stack.len() + usize::from(self.pending.is_some())
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.depth() > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Sealed groups on the undo stack.
    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// The group still accepting operations, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<&Group> {
        self.pending.as_ref()
    }

    /// Mark the current state as what is on disk.
    pub fn mark_saved(&mut self) {
        self.seal();
        self.save_point = Some(self.undo_stack.len());
    }

    /// Whether undo/redo has returned to the saved state.
    #[must_use]
    pub fn is_at_save_point(&self) -> bool {
        self.save_point == Some(self.depth())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
