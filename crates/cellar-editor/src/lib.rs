//! # cellar-editor: Editing core for cellar
//!
//! Everything between "bytes on disk" and "cells a renderer can draw":
//!
//! - **[`position`]**: `Position` (line, col) and `Range`, 0-indexed, columns in cells
//! - **[`mapping`]**: read-only file mapping backing unedited lines
//! - **[`line`]**: a line that is COLD (bytes only), WARM (decoded), or HOT (edited)
//! - **[`neighbor`]**: per-cell word classes and word motion
//! - **[`language`]**: keyword and delimiter tables per language
//! - **[`syntax`]**: per-line highlighting with block-comment state
//! - **[`markdown`]**: block and inline highlighting for markdown
//! - **[`pairs`]**: buffer-wide delimiter matching
//! - **[`history`]**: operation-log undo/redo with time-based grouping
//! - **[`search`]**: regex search and match marking
//! - **[`options`]**: `:set`-style configuration
//! - **[`buffer`]**: `Buffer`, tying all of the above together
//!
//! The core is single-threaded. Every operation runs to completion before
//! returning.

pub mod buffer;
pub mod error;
pub mod history;
pub mod language;
pub mod line;
pub mod mapping;
pub mod markdown;
pub mod neighbor;
pub mod options;
pub mod pairs;
pub mod position;
pub mod search;
pub mod syntax;

pub use buffer::Buffer;
pub use error::{Error, Result};
pub use history::{Clock, ManualClock, SystemClock};
pub use language::{Grammar, HighlightFlags, Language};
pub use options::{OptionError, OptionName, Options, Setting};
pub use position::{Position, Range};
pub use search::{Match, SearchDirection};
